//! Scope healing for `scopedRegistries`.
//!
//! Each scope may be owned by at most one registry record. Instead of
//! rejecting a request that would break that rule, the scope is moved: it
//! is stripped from every other record and added to the requested one.

use log::{debug, info, warn};
use serde_json::{Map, Value, json};

/// Apply the healing algorithm to a `scopedRegistries` array.
///
/// Returns `true` if any record was created or modified. The first record
/// declaring `url` becomes the owner; requested scopes are stripped from
/// every other record, including url-less ones and later duplicates of the
/// same url. A record whose `scopes` is missing or not an array is treated
/// as owning nothing and left untouched.
pub(crate) fn ensure_registry_scopes(
    registries: &mut Vec<Value>,
    name: &str,
    url: &str,
    scopes: &[String],
) -> bool {
    let mut dirty = false;

    let target = match registries.iter().position(|r| record_url(r) == Some(url)) {
        Some(index) => index,
        None => {
            registries.push(json!({ "name": name, "url": url, "scopes": [] }));
            debug!("Created scoped registry record for {}", url);
            dirty = true;
            registries.len() - 1
        }
    };

    for scope in scopes {
        for (index, record) in registries.iter_mut().enumerate() {
            if index == target {
                continue;
            }
            let owner = record_label(record);
            if let Some(owned) = record.get_mut("scopes").and_then(Value::as_array_mut) {
                let before = owned.len();
                owned.retain(|s| s.as_str() != Some(scope.as_str()));
                if owned.len() != before {
                    info!("Moved scope {} from {} to {}", scope, owner, url);
                    dirty = true;
                }
            }
        }

        if let Some(record) = registries[target].as_object_mut() {
            let owned = scopes_array(record, url, &mut dirty);
            if !owned.iter().any(|s| s.as_str() == Some(scope.as_str())) {
                owned.push(Value::String(scope.clone()));
                dirty = true;
            }
        }
    }

    dirty
}

fn record_url(record: &Value) -> Option<&str> {
    record.get("url").and_then(Value::as_str)
}

fn record_label(record: &Value) -> String {
    record_url(record)
        .or_else(|| record.get("name").and_then(Value::as_str))
        .unwrap_or("unnamed record")
        .to_string()
}

fn scopes_array<'r>(record: &'r mut Map<String, Value>, url: &str, dirty: &mut bool) -> &'r mut Vec<Value> {
    let slot = record
        .entry("scopes")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        warn!("Registry {} has malformed scopes {}, resetting", url, slot);
        *slot = Value::Array(Vec::new());
        *dirty = true;
    }
    match slot {
        Value::Array(owned) => owned,
        _ => unreachable!("scopes normalized to an array above"),
    }
}

/// Every scope string that appears in more than one record.
pub(crate) fn shared_scopes(registries: &[Value]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut shared: Vec<String> = Vec::new();
    for record in registries {
        let Some(owned) = record.get("scopes").and_then(Value::as_array) else {
            continue;
        };
        let mut in_record: Vec<&str> = owned.iter().filter_map(Value::as_str).collect();
        in_record.sort_unstable();
        in_record.dedup();
        for scope in in_record {
            if seen.contains(&scope) {
                if !shared.iter().any(|s| s == scope) {
                    shared.push(scope.to_string());
                }
            } else {
                seen.push(scope);
            }
        }
    }
    shared
}
