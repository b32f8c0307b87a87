//! The local "modify" step of a read-modify-write cycle.

use serde::{Deserialize, Serialize};

/// What to do when establishing a member that is already in the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Append unconditionally, possibly producing a duplicate entry.
    #[default]
    Append,
    /// Leave the list as it is and skip the remote write.
    Skip,
}

/// A single-member change to a whole-list attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberEdit {
    /// Add the member at the end of the list.
    Append(String),
    /// Drop every occurrence of the member, keeping the order of the rest.
    RemoveAll(String),
}

impl MemberEdit {
    /// The member this edit is about.
    pub fn member(&self) -> &str {
        match self {
            Self::Append(member) | Self::RemoveAll(member) => member,
        }
    }

    /// Compute the list to write back, or `None` when no write is needed.
    pub fn apply(&self, current: &[String], policy: DuplicatePolicy) -> Option<Vec<String>> {
        match self {
            Self::Append(member) => {
                if policy == DuplicatePolicy::Skip && current.contains(member) {
                    return None;
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend_from_slice(current);
                next.push(member.clone());
                Some(next)
            }
            Self::RemoveAll(member) => Some(
                current
                    .iter()
                    .filter(|existing| *existing != member)
                    .cloned()
                    .collect(),
            ),
        }
    }
}
