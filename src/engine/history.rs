use crate::model::{CloudMeta, RecordStore, Ts};

use super::resolve::find_current;

/// Seed history and deployed entries for hosts and clouds that lack them.
///
/// Hosts get a key-0 assignment entry holding the resolver's current effective
/// cloud; clouds get a key-0 snapshot of their current metadata. With the seed
/// in place, queries about instants before the first recorded change still get
/// an answer. Returns true when anything was written so the caller knows to
/// persist the store.
pub(crate) fn seed_missing(store: &mut RecordStore, now: Ts) -> bool {
    let mut changed = false;

    let host_names: Vec<String> = store.hosts.keys().cloned().collect();
    for name in host_names {
        let missing_history = !store.history.contains_key(&name);
        let missing_deployed = !store.deployed.contains_key(&name);
        if !missing_history && !missing_deployed {
            continue;
        }
        let Some(a) = find_current(store, &name, now, now) else {
            continue;
        };
        if missing_history {
            store
                .history
                .entry(name.clone())
                .or_default()
                .insert(0, a.current_cloud.clone());
        }
        if missing_deployed {
            store.deployed.insert(name, a.current_cloud);
        }
        changed = true;
    }

    let cloud_names: Vec<String> = store.clouds.keys().cloned().collect();
    for name in cloud_names {
        if store.cloud_history.contains_key(&name) {
            continue;
        }
        if let Some(meta) = store.clouds.get(&name).cloned() {
            store.cloud_history.entry(name).or_default().insert(0, meta);
            changed = true;
        }
    }

    changed
}

/// Record that `host`'s default assignment became `cloud` at `now`.
pub(crate) fn record_assignment(store: &mut RecordStore, host: &str, cloud: &str, now: Ts) {
    store
        .history
        .entry(host.to_string())
        .or_default()
        .insert(now, cloud.to_string());
}

/// Record a full metadata snapshot for `cloud` at `now`.
pub(crate) fn record_cloud(store: &mut RecordStore, cloud: &str, meta: CloudMeta, now: Ts) {
    store
        .cloud_history
        .entry(cloud.to_string())
        .or_default()
        .insert(now, meta);
}
