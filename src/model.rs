use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Unix seconds — the only time type.
pub type Ts = i64;

/// Override id, unique within one host's schedule.
pub type OverrideId = u32;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ts,
    pub end: Ts,
}

impl Span {
    pub fn new(start: Ts, end: Ts) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn contains_instant(&self, t: Ts) -> bool {
        self.start <= t && t < self.end
    }
}

/// A time-bounded exception assigning a host to a cloud other than its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub cloud: String,
    pub span: Span,
}

/// A schedulable machine. `cloud` is the long-lived default assignment; the
/// schedule holds the defined overrides keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub cloud: String,
    pub schedule: BTreeMap<OverrideId, Override>,
}

impl Host {
    pub fn new(cloud: impl Into<String>) -> Self {
        Self {
            cloud: cloud.into(),
            schedule: BTreeMap::new(),
        }
    }

    /// Next override id: one past the highest defined id, 0 for an empty schedule.
    pub fn next_override_id(&self) -> OverrideId {
        self.schedule
            .keys()
            .next_back()
            .map(|id| id + 1)
            .unwrap_or(0)
    }

    /// True if any override is still running at `t` or starts after it.
    pub fn has_override_beyond(&self, t: Ts) -> bool {
        self.schedule.values().any(|o| o.span.end > t)
    }
}

/// Cloud metadata. Every field has a defined value when the caller leaves it unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudMeta {
    pub description: String,
    pub owner: String,
    pub ccusers: BTreeSet<String>,
    pub ticket: String,
    pub qinq: bool,
}

impl Default for CloudMeta {
    fn default() -> Self {
        Self {
            description: String::new(),
            owner: "nobody".into(),
            ccusers: BTreeSet::new(),
            ticket: "000000".into(),
            qinq: false,
        }
    }
}

/// The whole record store — pure data, serialized as one snapshot.
///
/// `history` and `cloud_history` are append-only: keys are the Unix seconds at
/// which the authoritative value changed, and lookups take the greatest key at
/// or before the queried instant. `deployed` tracks the cloud the provisioning
/// layer last realized for each host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    pub hosts: BTreeMap<String, Host>,
    pub clouds: BTreeMap<String, CloudMeta>,
    pub history: BTreeMap<String, BTreeMap<Ts, String>>,
    pub cloud_history: BTreeMap<String, BTreeMap<Ts, CloudMeta>>,
    pub deployed: BTreeMap<String, String>,
}

// ── Query result types ───────────────────────────────────────────

/// Result of resolving one host at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub default_cloud: String,
    pub current_cloud: String,
    pub override_id: Option<OverrideId>,
}

/// One pending reassignment the provisioning layer should realize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move {
    pub host: String,
    pub from: String,
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ov(cloud: &str, start: Ts, end: Ts) -> Override {
        Override {
            cloud: cloud.into(),
            span: Span::new(start, end),
        }
    }

    #[test]
    fn span_half_open() {
        let s = Span::new(100, 200);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // end is exclusive
        assert!(!s.contains_instant(99));
    }

    #[test]
    fn override_ids_count_up_from_zero() {
        let mut h = Host::new("cloud01");
        assert_eq!(h.next_override_id(), 0);

        h.schedule.insert(0, ov("cloud02", 100, 200));
        assert_eq!(h.next_override_id(), 1);

        h.schedule.insert(7, ov("cloud02", 300, 400));
        assert_eq!(h.next_override_id(), 8);
    }

    #[test]
    fn override_id_reused_after_top_removal() {
        // Removing the highest id frees it for the next assignment.
        let mut h = Host::new("cloud01");
        h.schedule.insert(0, ov("cloud02", 100, 200));
        h.schedule.insert(1, ov("cloud03", 200, 300));
        h.schedule.remove(&1);
        assert_eq!(h.next_override_id(), 1);
    }

    #[test]
    fn host_override_beyond() {
        let mut h = Host::new("cloud01");
        assert!(!h.has_override_beyond(0));

        h.schedule.insert(0, ov("cloud02", 100, 200));
        assert!(h.has_override_beyond(150)); // still running
        assert!(h.has_override_beyond(50)); // starts later
        assert!(!h.has_override_beyond(200)); // over, end exclusive
    }

    #[test]
    fn cloud_meta_defaults() {
        let m = CloudMeta::default();
        assert_eq!(m.owner, "nobody");
        assert_eq!(m.ticket, "000000");
        assert_eq!(m.description, "");
        assert!(m.ccusers.is_empty());
        assert!(!m.qinq);
    }

    #[test]
    fn store_serialization_roundtrip() {
        let mut store = RecordStore::default();
        store.clouds.insert("cloud01".into(), CloudMeta::default());
        let mut host = Host::new("cloud01");
        host.schedule.insert(0, ov("cloud01", 1000, 2000));
        store.hosts.insert("h1".into(), host);
        store
            .history
            .entry("h1".into())
            .or_default()
            .insert(0, "cloud01".into());

        let bytes = bincode::serialize(&store).unwrap();
        let decoded: RecordStore = bincode::deserialize(&bytes).unwrap();
        assert_eq!(store, decoded);
    }
}
