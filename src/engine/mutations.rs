use std::collections::BTreeSet;

use tracing::info;

use crate::limits::*;
use crate::model::{CloudMeta, Host, Move, Override, OverrideId, Ts};
use crate::observability;
use crate::timefmt::now_ts;

use super::conflict::{check_overlap, validate_bounds};
use super::resolve::find_current;
use super::{Engine, Entity, Error, history};

/// Fields of a cloud definition to change; unset fields keep their value
/// (or the documented default on first definition).
#[derive(Debug, Clone, Default)]
pub struct CloudUpdate {
    pub description: Option<String>,
    pub owner: Option<String>,
    pub ccusers: Option<BTreeSet<String>>,
    pub ticket: Option<String>,
    pub qinq: Option<bool>,
}

impl CloudUpdate {
    fn apply(&self, meta: &mut CloudMeta) {
        if let Some(d) = &self.description {
            meta.description = d.clone();
        }
        if let Some(o) = &self.owner {
            meta.owner = o.clone();
        }
        if let Some(cc) = &self.ccusers {
            meta.ccusers = cc.clone();
        }
        if let Some(t) = &self.ticket {
            meta.ticket = t.clone();
        }
        if let Some(q) = self.qinq {
            meta.qinq = q;
        }
    }
}

/// Fields of an override to change; unset fields keep the current value.
#[derive(Debug, Clone, Default)]
pub struct OverridePatch {
    pub cloud: Option<String>,
    pub start: Option<Ts>,
    pub end: Option<Ts>,
}

impl Engine {
    /// Define a cloud, or change an existing definition when `force` is set.
    pub fn define_cloud(&mut self, name: &str, update: CloudUpdate, force: bool) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::Validation("cloud name must not be empty"));
        }
        if name.len() > MAX_IDENT_LEN {
            return Err(Error::Limit("cloud name too long"));
        }
        if let Some(d) = &update.description
            && d.len() > MAX_DESCRIPTION_LEN
        {
            return Err(Error::Limit("cloud description too long"));
        }

        let existing = self.store.clouds.get(name).cloned();
        if existing.is_some() && !force {
            return Err(Error::Validation(
                "cloud is already defined; pass force to change it",
            ));
        }

        let mut meta = existing.clone().unwrap_or_default();
        update.apply(&mut meta);
        if existing.as_ref() == Some(&meta) {
            return Ok(()); // nothing changed
        }

        let now = now_ts();
        let mut next = self.store.clone();
        next.clouds.insert(name.to_string(), meta.clone());
        if existing.is_none() {
            // Seed at zero so queries about instants before the definition resolve.
            next.cloud_history
                .entry(name.to_string())
                .or_default()
                .insert(0, meta);
        } else {
            history::record_cloud(&mut next, name, meta, now);
        }
        self.commit(next, "define_cloud")?;
        info!(cloud = name, "cloud defined");
        Ok(())
    }

    /// Remove a cloud. Refused while any host default or override references it.
    pub fn remove_cloud(&mut self, name: &str) -> Result<(), Error> {
        if !self.store.clouds.contains_key(name) {
            return Err(Error::NotFound(Entity::Cloud, name.to_string()));
        }
        let referenced = self.store.hosts.values().any(|h| {
            h.cloud == name || h.schedule.values().any(|o| o.cloud == name)
        });
        if referenced {
            return Err(Error::Validation("cloud is still referenced by hosts"));
        }

        let mut next = self.store.clone();
        next.clouds.remove(name);
        // cloud_history stays: it answers queries about the past.
        self.commit(next, "remove_cloud")?;
        info!(cloud = name, "cloud removed");
        Ok(())
    }

    /// Define a host with its default cloud, or move the default when `force` is set.
    pub fn define_host(&mut self, name: &str, cloud: &str, force: bool) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::Validation("host name must not be empty"));
        }
        if name.len() > MAX_IDENT_LEN {
            return Err(Error::Limit("host name too long"));
        }
        if !self.store.clouds.contains_key(cloud) {
            return Err(Error::NotFound(Entity::Cloud, cloud.to_string()));
        }

        let now = now_ts();
        let mut next = self.store.clone();
        if let Some(host) = self.store.hosts.get(name) {
            if !force {
                return Err(Error::Validation(
                    "host is already defined; pass force to move it",
                ));
            }
            if host.cloud == cloud {
                return Ok(()); // nothing changed
            }
            next.hosts.get_mut(name).unwrap().cloud = cloud.to_string();
            history::record_assignment(&mut next, name, cloud, now);
        } else {
            next.hosts.insert(name.to_string(), Host::new(cloud));
            next.deployed.insert(name.to_string(), cloud.to_string());
            // A host seen for the first time seeds its history at zero; one
            // re-added after removal gets a change entry instead.
            let hist = next.history.entry(name.to_string()).or_default();
            if hist.is_empty() {
                hist.insert(0, cloud.to_string());
            } else {
                hist.insert(now, cloud.to_string());
            }
        }
        self.commit(next, "define_host")?;
        info!(host = name, cloud, "host defined");
        Ok(())
    }

    /// Remove a host. Refused while the host has running or future overrides.
    pub fn remove_host(&mut self, name: &str) -> Result<(), Error> {
        let Some(host) = self.store.hosts.get(name) else {
            return Err(Error::NotFound(Entity::Host, name.to_string()));
        };
        if host.has_override_beyond(now_ts()) {
            return Err(Error::Validation(
                "host has running or future overrides; remove them first",
            ));
        }

        let mut next = self.store.clone();
        next.hosts.remove(name);
        next.deployed.remove(name);
        // Assignment history stays: it answers queries about the past.
        self.commit(next, "remove_host")?;
        info!(host = name, "host removed");
        Ok(())
    }

    /// Add a schedule override moving `host` to `cloud` over `[start, end)`.
    /// Returns the id assigned to the new override.
    pub fn add_override(
        &mut self,
        host: &str,
        cloud: &str,
        start: Ts,
        end: Ts,
    ) -> Result<OverrideId, Error> {
        let span = validate_bounds(start, end)?;
        if !self.store.clouds.contains_key(cloud) {
            return Err(Error::NotFound(Entity::Cloud, cloud.to_string()));
        }
        let Some(h) = self.store.hosts.get(host) else {
            return Err(Error::NotFound(Entity::Host, host.to_string()));
        };
        if h.schedule.len() >= MAX_OVERRIDES_PER_HOST {
            return Err(Error::Limit("too many overrides on host"));
        }
        if let Err(e) = check_overlap(h, span, None) {
            metrics::counter!(observability::CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }

        let id = h.next_override_id();
        let mut next = self.store.clone();
        next.hosts.get_mut(host).unwrap().schedule.insert(
            id,
            Override {
                cloud: cloud.to_string(),
                span,
            },
        );
        self.commit(next, "add_override")?;
        info!(host, cloud, id, "override added");
        Ok(id)
    }

    /// Delete an override by id.
    pub fn remove_override(&mut self, host: &str, id: OverrideId) -> Result<(), Error> {
        let Some(h) = self.store.hosts.get(host) else {
            return Err(Error::NotFound(Entity::Host, host.to_string()));
        };
        if !h.schedule.contains_key(&id) {
            return Err(Error::NotFound(Entity::Override, id.to_string()));
        }

        let mut next = self.store.clone();
        next.hosts.get_mut(host).unwrap().schedule.remove(&id);
        self.commit(next, "remove_override")?;
        info!(host, id, "override removed");
        Ok(())
    }

    /// Change an override in place. Unset patch fields keep their current
    /// value; all three fields are rewritten together or not at all.
    pub fn modify_override(
        &mut self,
        host: &str,
        id: OverrideId,
        patch: OverridePatch,
    ) -> Result<(), Error> {
        let Some(h) = self.store.hosts.get(host) else {
            return Err(Error::NotFound(Entity::Host, host.to_string()));
        };
        let Some(current) = h.schedule.get(&id) else {
            return Err(Error::NotFound(Entity::Override, id.to_string()));
        };

        let cloud = patch.cloud.unwrap_or_else(|| current.cloud.clone());
        let start = patch.start.unwrap_or(current.span.start);
        let end = patch.end.unwrap_or(current.span.end);

        let span = validate_bounds(start, end)?;
        if !self.store.clouds.contains_key(&cloud) {
            return Err(Error::NotFound(Entity::Cloud, cloud));
        }
        if let Err(e) = check_overlap(h, span, Some(id)) {
            metrics::counter!(observability::CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }

        let mut next = self.store.clone();
        next.hosts
            .get_mut(host)
            .unwrap()
            .schedule
            .insert(id, Override { cloud, span });
        self.commit(next, "modify_override")?;
        info!(host, id, "override modified");
        Ok(())
    }

    /// Compute the reassignments the provisioning layer would have to realize
    /// for the store to match the resolved state at `at` (default: now).
    /// Read-only — this is the dry-run surface.
    pub fn plan_moves(&self, at: Option<Ts>) -> Vec<Move> {
        let now = now_ts();
        let at = at.unwrap_or(now);
        let mut moves = Vec::new();
        for (name, host) in &self.store.hosts {
            let Some(a) = find_current(&self.store, name, at, now) else {
                continue;
            };
            let recorded = self
                .store
                .deployed
                .get(name)
                .unwrap_or(&host.cloud)
                .clone();
            if recorded != a.current_cloud {
                moves.push(Move {
                    host: name.clone(),
                    from: recorded,
                    to: a.current_cloud,
                });
            }
        }
        moves
    }

    /// Realize pending moves through the provisioning backend and record the
    /// new deployed clouds. Moves already realized stay recorded even when a
    /// later one fails; persistence afterwards is best-effort.
    pub fn sync_state(&mut self, at: Option<Ts>) -> Result<Vec<Move>, Error> {
        let moves = self.plan_moves(at);
        let mut next = self.store.clone();
        for m in &moves {
            if let Err(e) = self.backend.apply_assignment(&m.host, &m.from, &m.to) {
                self.store = next;
                let _ = self.persist(false);
                return Err(Error::Backend(e.to_string()));
            }
            next.deployed.insert(m.host.clone(), m.to.clone());
            metrics::counter!(observability::MOVES_TOTAL).increment(1);
            info!(host = %m.host, from = %m.from, to = %m.to, "host moved");
        }
        self.store = next;
        self.persist(false)?;
        Ok(moves)
    }
}
