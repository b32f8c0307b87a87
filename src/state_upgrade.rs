//! Migrations for stored connection state written by older schema versions.
//!
//! State is handled as raw JSON since older versions no longer match any
//! current type. Each upgrader takes the state of version `n` and returns
//! the state of version `n + 1`.

use log::debug;
use serde_json::{Value, json};

/// Schema version produced by [`upgrade_state`].
pub const CURRENT_VERSION: u32 = 2;

/// Version 0 stored `options[0].strategy_version` as a string.
pub fn upgrade_v0(mut state: Value) -> Value {
    let Some(options) = first_options(&mut state) else {
        return state;
    };

    if let Some(Value::String(raw)) = options.get("strategy_version") {
        let version = raw.parse::<i64>().unwrap_or(0);
        debug!("Migrating strategy_version '{}' to {}", raw, version);
        options.insert("strategy_version".to_string(), json!(version));
    }
    state
}

/// Version 1 stored `options[0].validation` as a single object instead of a
/// list keyed by attribute.
pub fn upgrade_v1(mut state: Value) -> Value {
    let Some(options) = first_options(&mut state) else {
        return state;
    };

    if let Some(validation) = options.remove("validation") {
        debug!("Migrating options.validation to username validation list");
        options.insert(
            "validation".to_string(),
            json!([{ "username": [validation] }]),
        );
    }
    state
}

/// Apply every upgrader from `version` up to [`CURRENT_VERSION`], in order.
pub fn upgrade_state(version: u32, mut state: Value) -> Value {
    let upgraders: [fn(Value) -> Value; 2] = [upgrade_v0, upgrade_v1];
    for (from, upgrade) in upgraders.iter().enumerate().skip(version as usize) {
        debug!("Upgrading connection state from version {}", from);
        state = upgrade(state);
    }
    state
}

fn first_options(state: &mut Value) -> Option<&mut serde_json::Map<String, Value>> {
    state
        .get_mut("options")?
        .as_array_mut()?
        .first_mut()?
        .as_object_mut()
}
