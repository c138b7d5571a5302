use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Replication policy reported by the master.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Strongly consistent writes (CP).
    #[default]
    Sync,
    /// Eventually consistent writes, higher availability (AP).
    Async,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sync => "sync",
            Mode::Async => "async",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStat {
    pub address: String,
    pub key_count: u64,
    pub request_rate: u64,
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RingConfig {
    pub replicas: u32,
}

/// One point-in-time view of backend state, as served by `/status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub nodes: Vec<String>,
    pub mode: Mode,
    #[serde(default)]
    pub stats: Vec<NodeStat>,
    #[serde(default)]
    pub config: RingConfig,
}

/// Reconciled dashboard state. Single writer: only the event loop
/// mutates it, once per delivered snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub nodes: Vec<String>,
    pub mode: Mode,
    pub stats: HashMap<String, NodeStat>,
    pub replicas: u32,
    pub selected: Option<String>,
}

impl ViewState {
    pub fn total_keys(&self) -> u64 {
        self.stats.values().map(|s| s.key_count).sum()
    }
}

/// Merge a fresh snapshot into view state. Pure: same inputs, same output.
///
/// The stat list becomes a map keyed by address; the previous selection
/// survives unless its node is gone from the new membership list.
pub fn reconcile(old: &ViewState, snap: SystemSnapshot) -> ViewState {
    // A stat for a departed node can outlive it for one backend tick;
    // drop it so totals only count live members.
    let stats: HashMap<String, NodeStat> = snap
        .stats
        .into_iter()
        .filter(|s| snap.nodes.contains(&s.address))
        .map(|s| (s.address.clone(), s))
        .collect();

    let selected = old
        .selected
        .as_ref()
        .filter(|sel| snap.nodes.iter().any(|n| n == *sel))
        .cloned();

    ViewState {
        nodes: snap.nodes,
        mode: snap.mode,
        stats,
        replicas: snap.config.replicas,
        selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(nodes: &[&str]) -> SystemSnapshot {
        SystemSnapshot {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            mode: Mode::Sync,
            stats: nodes
                .iter()
                .map(|n| NodeStat {
                    address: n.to_string(),
                    key_count: 3,
                    request_rate: 7,
                    keys: vec!["k1".into()],
                })
                .collect(),
            config: RingConfig { replicas: 20 },
        }
    }

    #[test]
    fn test_parse_status_payload() {
        let json = r#"{
            "nodes": ["127.0.0.1:9001", "127.0.0.1:9002"],
            "mode": "async",
            "stats": [
                {"address": "127.0.0.1:9001", "key_count": 2, "request_rate": 5, "keys": ["a", "b"]}
            ],
            "config": {"replicas": 20}
        }"#;

        let snap: SystemSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.nodes.len(), 2);
        assert_eq!(snap.mode, Mode::Async);
        assert_eq!(snap.stats[0].keys, vec!["a", "b"]);
        assert_eq!(snap.config.replicas, 20);
    }

    #[test]
    fn test_reconcile_keys_stats_by_address() {
        let view = reconcile(&ViewState::default(), snapshot(&["a:9001", "b:9002"]));
        assert_eq!(view.stats.len(), 2);
        assert_eq!(view.stats["a:9001"].request_rate, 7);
        assert_eq!(view.total_keys(), 6);
    }

    #[test]
    fn test_reconcile_drops_stats_for_departed_nodes() {
        let mut snap = snapshot(&["a:9001"]);
        snap.stats.push(NodeStat {
            address: "ghost:9999".to_string(),
            key_count: 50,
            request_rate: 1,
            keys: vec![],
        });

        let view = reconcile(&ViewState::default(), snap);
        assert!(view.stats.keys().all(|addr| view.nodes.contains(addr)));
        assert!(!view.stats.contains_key("ghost:9999"));
        assert_eq!(view.total_keys(), 3);
    }

    #[test]
    fn test_reconcile_preserves_live_selection() {
        let mut old = reconcile(&ViewState::default(), snapshot(&["a:9001", "b:9002"]));
        old.selected = Some("a:9001".to_string());

        let view = reconcile(&old, snapshot(&["a:9001", "c:9003"]));
        assert_eq!(view.selected.as_deref(), Some("a:9001"));
    }

    #[test]
    fn test_reconcile_resets_departed_selection() {
        let mut old = reconcile(&ViewState::default(), snapshot(&["a:9001"]));
        old.selected = Some("a:9001".to_string());

        let view = reconcile(&old, snapshot(&[]));
        assert_eq!(view.selected, None);
        assert!(view.nodes.is_empty());
        assert!(view.stats.is_empty());
    }

    #[test]
    fn test_reconcile_selection_always_member_of_nodes() {
        let mut old = ViewState::default();
        old.selected = Some("ghost:9999".to_string());

        let view = reconcile(&old, snapshot(&["a:9001", "b:9002"]));
        match &view.selected {
            None => {}
            Some(sel) => assert!(view.nodes.contains(sel)),
        }
        assert_eq!(view.selected, None);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let mut old = reconcile(&ViewState::default(), snapshot(&["a:9001", "b:9002"]));
        old.selected = Some("b:9002".to_string());

        let a = reconcile(&old, snapshot(&["b:9002", "c:9003"]));
        let b = reconcile(&old, snapshot(&["b:9002", "c:9003"]));
        assert_eq!(a, b);
    }
}
