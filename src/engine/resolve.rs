use crate::model::{Assignment, CloudMeta, RecordStore, Ts};

/// Resolve the effective cloud for `host` at instant `at`.
///
/// Overrides win at any instant. Assignment history is consulted only when
/// `at` lies strictly before `now` — history records past default values, and
/// the live default already reflects the latest change. Returns `None` for an
/// undefined host so callers iterating many hosts can skip it rather than fail.
pub fn find_current(store: &RecordStore, host: &str, at: Ts, now: Ts) -> Option<Assignment> {
    let h = store.hosts.get(host)?;
    let default_cloud = h.cloud.clone();

    for (&id, ov) in &h.schedule {
        if ov.span.contains_instant(at) {
            return Some(Assignment {
                default_cloud,
                current_cloud: ov.cloud.clone(),
                override_id: Some(id),
            });
        }
    }

    let mut current_cloud = default_cloud.clone();
    if at < now
        && let Some(hist) = store.history.get(host)
        && let Some((_, cloud)) = hist.range(..=at).next_back()
    {
        current_cloud = cloud.clone();
    }

    Some(Assignment {
        default_cloud,
        current_cloud,
        override_id: None,
    })
}

/// Default cloud recorded for `host` as of `at`: greatest change key at or before it.
pub fn assignment_at<'a>(store: &'a RecordStore, host: &str, at: Ts) -> Option<&'a str> {
    store
        .history
        .get(host)?
        .range(..=at)
        .next_back()
        .map(|(_, cloud)| cloud.as_str())
}

/// Cloud metadata as of `at`: the recorded snapshot for past instants, the
/// live value for present and future ones.
pub fn metadata_at<'a>(
    store: &'a RecordStore,
    cloud: &str,
    at: Ts,
    now: Ts,
) -> Option<&'a CloudMeta> {
    if at < now
        && let Some(hist) = store.cloud_history.get(cloud)
        && let Some((_, meta)) = hist.range(..=at).next_back()
    {
        return Some(meta);
    }
    store.clouds.get(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudMeta, Host, Override, Span};

    const NOW: Ts = 1_800_000_000;

    fn store_with_host(host: Host) -> RecordStore {
        let mut store = RecordStore::default();
        store.clouds.insert("cloud01".into(), CloudMeta::default());
        store.clouds.insert("cloud02".into(), CloudMeta::default());
        store.hosts.insert("h1".into(), host);
        store
    }

    #[test]
    fn bare_host_resolves_to_default_at_any_instant() {
        let store = store_with_host(Host::new("cloud01"));
        for at in [0, NOW - 1, NOW, NOW + 1_000_000] {
            let a = find_current(&store, "h1", at, NOW).unwrap();
            assert_eq!(a.default_cloud, "cloud01");
            assert_eq!(a.current_cloud, "cloud01");
            assert_eq!(a.override_id, None);
        }
    }

    #[test]
    fn unknown_host_resolves_to_none() {
        let store = store_with_host(Host::new("cloud01"));
        assert!(find_current(&store, "ghost", NOW, NOW).is_none());
    }

    #[test]
    fn override_wins_inside_its_bounds() {
        let mut h = Host::new("cloud01");
        h.schedule.insert(
            0,
            Override {
                cloud: "cloud02".into(),
                span: Span::new(1000, 2000),
            },
        );
        let store = store_with_host(h);

        let a = find_current(&store, "h1", 1500, NOW).unwrap();
        assert_eq!(a.current_cloud, "cloud02");
        assert_eq!(a.override_id, Some(0));
        assert_eq!(a.default_cloud, "cloud01");

        // Start is inclusive, end exclusive, one second before start is out.
        assert_eq!(
            find_current(&store, "h1", 1000, NOW).unwrap().override_id,
            Some(0)
        );
        assert_eq!(find_current(&store, "h1", 999, NOW).unwrap().override_id, None);
        let at_end = find_current(&store, "h1", 2000, NOW).unwrap();
        assert_eq!(at_end.current_cloud, "cloud01");
        assert_eq!(at_end.override_id, None);
    }

    #[test]
    fn override_applies_to_future_instants() {
        let mut h = Host::new("cloud01");
        h.schedule.insert(
            3,
            Override {
                cloud: "cloud02".into(),
                span: Span::new(NOW + 100, NOW + 200),
            },
        );
        let store = store_with_host(h);
        let a = find_current(&store, "h1", NOW + 150, NOW).unwrap();
        assert_eq!(a.current_cloud, "cloud02");
        assert_eq!(a.override_id, Some(3));
    }

    #[test]
    fn history_answers_past_queries_only() {
        // Default moved from cloud01 to cloud02 at T; the live default is cloud02.
        let t_change: Ts = NOW - 5000;
        let mut store = store_with_host(Host::new("cloud02"));
        let hist = store.history.entry("h1".into()).or_default();
        hist.insert(0, "cloud01".into());
        hist.insert(t_change, "cloud02".into());

        // Before the change: the old default, via history.
        let before = find_current(&store, "h1", t_change - 1, NOW).unwrap();
        assert_eq!(before.current_cloud, "cloud01");
        assert_eq!(before.default_cloud, "cloud02");

        // After the change but still in the past: history and live default agree.
        let after = find_current(&store, "h1", t_change + 1, NOW).unwrap();
        assert_eq!(after.current_cloud, "cloud02");

        // At the change instant itself the new value already holds.
        let at = find_current(&store, "h1", t_change, NOW).unwrap();
        assert_eq!(at.current_cloud, "cloud02");

        // Present and future queries never read history.
        for at in [NOW, NOW + 1] {
            let a = find_current(&store, "h1", at, NOW).unwrap();
            assert_eq!(a.current_cloud, "cloud02");
        }
    }

    #[test]
    fn seeded_entry_covers_everything_before_first_change() {
        let mut store = store_with_host(Host::new("cloud01"));
        store
            .history
            .entry("h1".into())
            .or_default()
            .insert(0, "cloud01".into());

        assert_eq!(assignment_at(&store, "h1", 0), Some("cloud01"));
        assert_eq!(assignment_at(&store, "h1", NOW - 1), Some("cloud01"));
        assert_eq!(assignment_at(&store, "ghost", 0), None);
    }

    #[test]
    fn metadata_snapshot_for_past_live_for_future() {
        let t_change: Ts = NOW - 5000;
        let mut store = RecordStore::default();
        let mut live = CloudMeta::default();
        live.description = "perf rack".into();
        store.clouds.insert("cloud01".into(), live);

        let mut old = CloudMeta::default();
        old.description = "idle".into();
        let hist = store.cloud_history.entry("cloud01".into()).or_default();
        hist.insert(0, old);
        let mut changed = CloudMeta::default();
        changed.description = "perf rack".into();
        hist.insert(t_change, changed);

        assert_eq!(
            metadata_at(&store, "cloud01", t_change - 1, NOW)
                .unwrap()
                .description,
            "idle"
        );
        assert_eq!(
            metadata_at(&store, "cloud01", NOW, NOW).unwrap().description,
            "perf rack"
        );
        assert_eq!(
            metadata_at(&store, "cloud01", NOW + 100, NOW)
                .unwrap()
                .description,
            "perf rack"
        );
        assert!(metadata_at(&store, "ghost", NOW, NOW).is_none());
    }
}
