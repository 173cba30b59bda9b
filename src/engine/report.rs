use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{OverrideId, RecordStore, Span, Ts};
use crate::timefmt::{days_in_month, midnight, now_ts};

use super::resolve::{find_current, metadata_at};
use super::{Engine, Error};

/// Hosts grouped under one cloud at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudSummary {
    pub cloud: String,
    pub hosts: Vec<String>,
    /// Description as of the queried instant (recorded snapshot for the past).
    pub description: String,
}

/// One row of a host's schedule listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideEntry {
    pub id: OverrideId,
    pub cloud: String,
    pub span: Span,
}

/// Full schedule listing for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostReport {
    pub host: String,
    pub default_cloud: String,
    pub current_cloud: String,
    pub active_override: Option<OverrideId>,
    /// Every defined override in id order, active or not.
    pub overrides: Vec<OverrideEntry>,
}

/// Static cloud metadata listing (owners, cc users, tickets, qinq).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudInfo {
    pub cloud: String,
    pub description: String,
    pub owner: String,
    pub ccusers: Vec<String>,
    pub ticket: String,
    pub qinq: bool,
}

/// Day-by-day effective assignment for every host over one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Per host, the effective cloud at 00:00 of day 1..=last.
    pub rows: BTreeMap<String, Vec<String>>,
}

/// Resolve every host at `at` and group them by effective cloud. Clouds that
/// own nothing are listed only when `include_empty` is set.
pub fn summary(store: &RecordStore, at: Ts, now: Ts, include_empty: bool) -> Vec<CloudSummary> {
    let mut grouped: BTreeMap<&str, Vec<String>> = store
        .clouds
        .keys()
        .map(|c| (c.as_str(), Vec::new()))
        .collect();
    for name in store.hosts.keys() {
        if let Some(a) = find_current(store, name, at, now)
            && let Some(hosts) = grouped.get_mut(a.current_cloud.as_str())
        {
            hosts.push(name.clone());
        }
    }
    grouped
        .into_iter()
        .filter(|(_, hosts)| include_empty || !hosts.is_empty())
        .map(|(cloud, hosts)| CloudSummary {
            cloud: cloud.to_string(),
            hosts,
            description: metadata_at(store, cloud, at, now)
                .map(|m| m.description.clone())
                .unwrap_or_default(),
        })
        .collect()
}

/// Schedule listing for one host: resolution at `at` plus every defined
/// override regardless of the queried instant. `None` for an unknown host.
pub fn host_report(store: &RecordStore, host: &str, at: Ts, now: Ts) -> Option<HostReport> {
    let a = find_current(store, host, at, now)?;
    let h = store.hosts.get(host)?;
    Some(HostReport {
        host: host.to_string(),
        default_cloud: a.default_cloud,
        current_cloud: a.current_cloud,
        active_override: a.override_id,
        overrides: h
            .schedule
            .iter()
            .map(|(&id, o)| OverrideEntry {
                id,
                cloud: o.cloud.clone(),
                span: o.span,
            })
            .collect(),
    })
}

/// Flat metadata listing of every defined cloud.
pub fn cloud_directory(store: &RecordStore) -> Vec<CloudInfo> {
    store
        .clouds
        .iter()
        .map(|(name, m)| CloudInfo {
            cloud: name.clone(),
            description: m.description.clone(),
            owner: m.owner.clone(),
            ccusers: m.ccusers.iter().cloned().collect(),
            ticket: m.ticket.clone(),
            qinq: m.qinq,
        })
        .collect()
}

/// Resolve every host at midnight of each day of the given month. The grid is
/// sized to the real month length, leap years included.
pub fn month_grid(
    store: &RecordStore,
    year: i32,
    month: u32,
    now: Ts,
) -> Result<MonthGrid, Error> {
    let days = days_in_month(year, month).ok_or(Error::Validation("no such calendar month"))?;
    let mut day_starts = Vec::with_capacity(days as usize);
    for day in 1..=days {
        day_starts.push(midnight(year, month, day).ok_or(Error::Validation("no such calendar month"))?);
    }

    let mut rows = BTreeMap::new();
    for name in store.hosts.keys() {
        let cells: Vec<String> = day_starts
            .iter()
            .map(|&ts| {
                find_current(store, name, ts, now)
                    .map(|a| a.current_cloud)
                    .unwrap_or_default()
            })
            .collect();
        rows.insert(name.clone(), cells);
    }
    Ok(MonthGrid { year, month, rows })
}

impl Engine {
    pub fn summary(&self, at: Option<Ts>, include_empty: bool) -> Vec<CloudSummary> {
        let now = now_ts();
        summary(&self.store, at.unwrap_or(now), now, include_empty)
    }

    pub fn host_report(&self, host: &str, at: Option<Ts>) -> Option<HostReport> {
        let now = now_ts();
        host_report(&self.store, host, at.unwrap_or(now), now)
    }

    pub fn cloud_directory(&self) -> Vec<CloudInfo> {
        cloud_directory(&self.store)
    }

    pub fn month_grid(&self, year: i32, month: u32) -> Result<MonthGrid, Error> {
        month_grid(&self.store, year, month, now_ts())
    }
}
