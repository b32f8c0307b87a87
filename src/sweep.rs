//! Cleanup of connections left behind by acceptance test runs.

use crate::management::{ListOptions, ManagementApi, ManagementError};
use log::{debug, info, warn};
use thiserror::Error;

/// Page size used while listing connections.
pub const SWEEP_PAGE_SIZE: usize = 50;

/// Errors returned by [`sweep_connections`] and [`SweepReport::into_result`].
#[derive(Debug, Clone, Error)]
pub enum SweepError {
    #[error("Failed to list connections: {0}")]
    List(#[source] ManagementError),

    #[error("Failed to delete {} connection(s): {}", .failures.len(), summarize(.failures))]
    Delete {
        failures: Vec<(String, ManagementError)>,
    },
}

fn summarize(failures: &[(String, ManagementError)]) -> String {
    failures
        .iter()
        .map(|(id, err)| format!("{}: {}", id, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// What a sweep examined and removed.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub examined: usize,
    pub deleted: Vec<String>,
    pub failures: Vec<(String, ManagementError)>,
}

impl SweepReport {
    pub fn into_result(self) -> Result<Self, SweepError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(SweepError::Delete {
                failures: self.failures,
            })
        }
    }
}

/// Name filter used by the acceptance tests' sweeper.
pub fn is_test_connection(name: &str) -> bool {
    name.contains("Test")
}

/// Delete every connection whose name matches `filter`.
///
/// Listing failures abort the sweep. Delete failures are collected in the
/// report and the sweep carries on.
pub async fn sweep_connections<M, F>(api: &M, filter: F) -> Result<SweepReport, SweepError>
where
    M: ManagementApi,
    F: Fn(&str) -> bool,
{
    let mut report = SweepReport::default();
    let mut page = 0;

    loop {
        let options = ListOptions::default()
            .page(page)
            .per_page(SWEEP_PAGE_SIZE)
            .include_fields(["id", "name"]);
        let list = api
            .list_connections(options)
            .await
            .map_err(SweepError::List)?;

        for connection in &list.connections {
            report.examined += 1;
            debug!(
                "Examining connection '{}' ({})",
                connection.name(),
                connection.id()
            );
            if !filter(connection.name()) {
                continue;
            }
            match api.delete_connection(connection.id()).await {
                Ok(()) => {
                    info!("Deleted connection '{}'", connection.id());
                    report.deleted.push(connection.id().to_string());
                }
                Err(err) => {
                    warn!("Failed to delete connection '{}': {}", connection.id(), err);
                    report.failures.push((connection.id().to_string(), err));
                }
            }
        }

        if !list.has_next() {
            break;
        }
        page += 1;
    }

    Ok(report)
}
