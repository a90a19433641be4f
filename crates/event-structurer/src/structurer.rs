//! Raw insight data to event packets.

use bridge_outbox::EventPacket;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Value of the `source` field on every packet.
pub const EVENT_SOURCE: &str = "InsightCore";

/// Context used when the producer doesn't supply one.
pub const DEFAULT_CONTEXT: &str = "user_behavior";

/// Reward signal per task state. Unlisted states score 0.
pub const REWARD_MAP: &[(&str, i64)] = &[
    ("completed", 1),
    ("skipped", -1),
    ("positive_feedback", 2),
    ("negative_feedback", -2),
];

pub fn reward_for(state: &str) -> i64 {
    REWARD_MAP
        .iter()
        .find(|(name, _)| *name == state)
        .map(|(_, reward)| *reward)
        .unwrap_or(0)
}

/// Build an event packet from raw producer data.
///
/// The raw map is carried whole under `data`. A missing or non-string
/// `state` becomes `"unknown"`.
pub fn generate_telemetry_event(raw: &EventPacket, event_type: &str, context: &str) -> EventPacket {
    let state = raw
        .get("state")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let reward = reward_for(&state);

    let mut packet = EventPacket::new();
    packet.insert("source".into(), EVENT_SOURCE.into());
    packet.insert("event_type".into(), event_type.into());
    packet.insert("context".into(), context.into());
    packet.insert("state".into(), state.into());
    packet.insert("reward".into(), reward.into());
    packet.insert(
        "timestamp".into(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true).into(),
    );
    packet.insert("data".into(), Value::Object(raw.clone()));
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> EventPacket {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_rewards() {
        assert_eq!(reward_for("completed"), 1);
        assert_eq!(reward_for("skipped"), -1);
        assert_eq!(reward_for("positive_feedback"), 2);
        assert_eq!(reward_for("negative_feedback"), -2);
        assert_eq!(reward_for("abandoned"), 0);
        assert_eq!(reward_for(""), 0);
    }

    #[test]
    fn test_packet_shape_and_order() {
        let input = raw(json!({ "user_id": "vj_dhn", "task_id": 42, "state": "completed" }));
        let packet = generate_telemetry_event(&input, "task_update", DEFAULT_CONTEXT);

        let keys: Vec<&str> = packet.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["source", "event_type", "context", "state", "reward", "timestamp", "data"]
        );
        assert_eq!(packet["source"], "InsightCore");
        assert_eq!(packet["event_type"], "task_update");
        assert_eq!(packet["context"], "user_behavior");
        assert_eq!(packet["state"], "completed");
        assert_eq!(packet["reward"], 1);
        assert_eq!(packet["data"], Value::Object(input));

        let timestamp = packet["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_missing_state_is_unknown() {
        let packet =
            generate_telemetry_event(&raw(json!({ "user_id": "Raj" })), "task_update", "ops");
        assert_eq!(packet["state"], "unknown");
        assert_eq!(packet["reward"], 0);
        assert_eq!(packet["context"], "ops");
    }

    #[test]
    fn test_non_string_state_is_unknown() {
        let packet =
            generate_telemetry_event(&raw(json!({ "state": 7 })), "task_update", DEFAULT_CONTEXT);
        assert_eq!(packet["state"], "unknown");
    }
}
