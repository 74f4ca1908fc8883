//! Shared timestamp/identifier helpers for record envelopes.

use chrono::{Local, SecondsFormat};
use serde_json::Value as JsonValue;
use ulid::Ulid;
use uuid::Uuid;

/// Returns the current local time as an ISO-8601 string with microsecond
/// precision (e.g. `2026-08-06T14:02:11.503921+08:00`).
///
/// The fractional part is fixed-width so that lexicographic order matches
/// chronological order within a single host offset.
pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Identifier for a domain record. Opaque to the store; only equality matters.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Identifier for an audit-log event. ULIDs sort in creation order.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_iso(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
