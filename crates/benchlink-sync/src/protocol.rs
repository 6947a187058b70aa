// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wire protocol between controller and UI peer
//!
//! One JSON object per WebSocket text frame, two top-level categories:
//!
//! ```json
//! {"parameters": {"gen_freq": 1000.0}, "signals": {"osc_ch1": [0.01, 0.02]}}
//! ```
//!
//! Outbound: [`DataMessage`] per sync cycle (empty cycles send nothing) and
//! [`RejectMessage`] replies for refused inbound fields. Inbound:
//! [`SetMessage`] parameter batches. Parameter values travel as native JSON
//! scalars/arrays; inbound values are resolved against the registered kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use benchlink_state::{ParameterStore, ParameterValue};

use crate::common::SyncResult;

/// Outbound synchronization message: coalesced parameter changes plus
/// flushed signal samples from one cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataMessage {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signals: BTreeMap<String, Vec<f32>>,
}

impl DataMessage {
    /// Build the outbound message for one cycle from drained/flushed state
    pub fn from_cycle(
        parameters: Vec<(String, ParameterValue)>,
        signals: Vec<(String, Vec<f32>)>,
    ) -> Self {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(name, value)| (name, value.to_json()))
                .collect(),
            signals: signals.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.signals.is_empty()
    }

    pub fn encode(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Inbound parameter update batch from the UI peer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetMessage {
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl SetMessage {
    pub fn decode(text: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Reply naming inbound fields that were refused, and why
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectMessage {
    pub rejected: BTreeMap<String, String>,
}

impl RejectMessage {
    pub fn encode(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outcome of applying one inbound batch
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Fields applied to the store
    pub applied: usize,
    /// Refused fields with the refusal reason
    pub rejected: BTreeMap<String, String>,
}

impl ApplyReport {
    /// Reply for the peer, if anything was refused
    pub fn reject_reply(&self) -> Option<RejectMessage> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(RejectMessage {
                rejected: self.rejected.clone(),
            })
        }
    }
}

/// Apply an inbound batch to the store, field by field
///
/// A refused field (unknown name, type mismatch, constraint violation) is
/// skipped, recorded, and logged; the remaining fields in the batch still
/// apply. A single bad field never aborts the batch.
pub fn apply_set(store: &ParameterStore, message: &SetMessage) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (name, json) in &message.parameters {
        let kind = match store.kind_of(name) {
            Ok(kind) => kind,
            Err(e) => {
                warn!("[SYNC] Rejected peer write to '{}': {}", name, e);
                report.rejected.insert(name.clone(), e.to_string());
                continue;
            }
        };

        let Some(value) = ParameterValue::from_json(json, kind) else {
            let reason = format!("value does not decode as {}", kind);
            warn!("[SYNC] Rejected peer write to '{}': {}", name, reason);
            report.rejected.insert(name.clone(), reason);
            continue;
        };

        match store.apply_peer(name, value) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                warn!("[SYNC] Rejected peer write to '{}': {}", name, e);
                report.rejected.insert(name.clone(), e.to_string());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_state::Constraint;
    use serde_json::json;

    fn demo_store() -> ParameterStore {
        let store = ParameterStore::new();
        store
            .register(
                "gain",
                ParameterValue::Float(0.0),
                Constraint::Range { min: 0.0, max: 1.0 },
            )
            .unwrap();
        store
            .register("decimation", ParameterValue::Int(1), Constraint::None)
            .unwrap();
        store
            .register(
                "trg_edge",
                ParameterValue::Str("pos".to_string()),
                Constraint::Enum(vec![
                    ParameterValue::Str("pos".to_string()),
                    ParameterValue::Str("neg".to_string()),
                ]),
            )
            .unwrap();
        store.drain_changes();
        store
    }

    #[test]
    fn test_empty_cycle_message_is_empty() {
        let message = DataMessage::from_cycle(Vec::new(), Vec::new());
        assert!(message.is_empty());
    }

    #[test]
    fn test_encode_skips_empty_categories() {
        let message = DataMessage::from_cycle(
            vec![("gain".to_string(), ParameterValue::Float(0.5))],
            Vec::new(),
        );
        assert_eq!(message.encode().unwrap(), r#"{"parameters":{"gain":0.5}}"#);
    }

    #[test]
    fn test_outbound_round_trips_through_inbound_path() {
        // A value set on one store, serialized outbound, then parsed as if
        // received by a peer and applied to a fresh store with the same
        // registration, lands unchanged.
        let source = demo_store();
        source.set("gain", ParameterValue::Float(0.5)).unwrap();
        source.set("decimation", ParameterValue::Int(8)).unwrap();

        let outbound =
            DataMessage::from_cycle(source.drain_changes(), Vec::new()).encode().unwrap();

        let target = demo_store();
        let inbound = SetMessage::decode(&outbound).unwrap();
        let report = apply_set(&target, &inbound);

        assert_eq!(report.applied, 2);
        assert!(report.rejected.is_empty());
        assert_eq!(target.get("gain").unwrap(), ParameterValue::Float(0.5));
        assert_eq!(target.get("decimation").unwrap(), ParameterValue::Int(8));
    }

    #[test]
    fn test_partial_failure_applies_valid_fields() {
        let store = demo_store();
        let message = SetMessage::decode(
            r#"{"parameters": {"gain": 0.25, "bogus": 1, "decimation": 64}}"#,
        )
        .unwrap();

        let report = apply_set(&store, &message);

        assert_eq!(report.applied, 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected.contains_key("bogus"));
        assert_eq!(store.get("gain").unwrap(), ParameterValue::Float(0.25));
        assert_eq!(store.get("decimation").unwrap(), ParameterValue::Int(64));
    }

    #[test]
    fn test_type_mismatch_and_constraint_rejections() {
        let store = demo_store();
        let message = SetMessage {
            parameters: BTreeMap::from([
                ("decimation".to_string(), json!("fast")),
                ("gain".to_string(), json!(7.5)),
                ("trg_edge".to_string(), json!("both")),
            ]),
        };

        let report = apply_set(&store, &message);

        assert_eq!(report.applied, 0);
        assert_eq!(report.rejected.len(), 3);
        // Store untouched
        assert_eq!(store.get("decimation").unwrap(), ParameterValue::Int(1));
        assert_eq!(store.get("gain").unwrap(), ParameterValue::Float(0.0));
    }

    #[test]
    fn test_reject_reply_only_when_rejections_exist() {
        let store = demo_store();

        let clean = SetMessage::decode(r#"{"parameters": {"gain": 0.1}}"#).unwrap();
        assert!(apply_set(&store, &clean).reject_reply().is_none());

        let bad = SetMessage::decode(r#"{"parameters": {"gain": 99.0}}"#).unwrap();
        let reply = apply_set(&store, &bad).reject_reply().unwrap();
        assert!(reply.encode().unwrap().contains("gain"));
    }

    #[test]
    fn test_signal_payload_encoding() {
        let message = DataMessage::from_cycle(
            Vec::new(),
            vec![("osc_ch1".to_string(), vec![0.5, -0.5])],
        );
        let encoded = message.encode().unwrap();
        let decoded = DataMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.signals["osc_ch1"], vec![0.5, -0.5]);
    }
}
