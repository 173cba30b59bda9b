mod conflict;
mod error;
mod history;
mod mutations;
mod report;
mod resolve;

pub use conflict::check_overlap;
pub use error::{Entity, Error};
pub use mutations::{CloudUpdate, OverridePatch};
pub use report::{CloudInfo, CloudSummary, HostReport, MonthGrid, OverrideEntry};
pub use resolve::{assignment_at, find_current, metadata_at};

use std::time::Instant;

use tracing::warn;

use crate::backend::ProvisioningBackend;
use crate::model::{Assignment, RecordStore, Ts};
use crate::observability;
use crate::timefmt::{now_ts, parse_stamp};

/// The authoritative pool state plus the collaborator that loads, persists,
/// and physically realizes it.
///
/// One logical operation runs at a time; callers serialize concurrent use.
/// Every mutation validates first and persists before the in-memory store is
/// swapped, so a failure leaves the store exactly as before the call.
pub struct Engine {
    store: RecordStore,
    backend: Box<dyn ProvisioningBackend>,
}

impl Engine {
    /// Load the store through the backend and seed missing history entries.
    /// Load failure is fatal; anything seeded is written back best-effort.
    pub fn open(backend: Box<dyn ProvisioningBackend>) -> Result<Self, Error> {
        let mut store = backend
            .load_store()
            .map_err(|e| Error::Backend(e.to_string()))?;
        let seeded = history::seed_missing(&mut store, now_ts());
        let engine = Self { store, backend };
        if seeded {
            engine.persist(false)?;
        }
        Ok(engine)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Resolve `host` at `at`, defaulting to now. The wall-clock instant is
    /// captured once and gates the history lookup for the whole call.
    pub fn resolve(&self, host: &str, at: Option<Ts>) -> Option<Assignment> {
        let now = now_ts();
        let resolved = find_current(&self.store, host, at.unwrap_or(now), now);
        let outcome = if resolved.is_some() { "hit" } else { "unknown" };
        metrics::counter!(observability::RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
        resolved
    }

    /// Like [`Engine::resolve`], with the instant given in the boundary stamp
    /// format (`YYYY-MM-DD HH:MM`).
    pub fn resolve_stamp(&self, host: &str, at: Option<&str>) -> Result<Option<Assignment>, Error> {
        let at = at.map(parse_stamp).transpose()?;
        Ok(self.resolve(host, at))
    }

    /// Persist the current store. With `must_succeed` a failure becomes an
    /// error for the caller; otherwise it is logged and execution continues
    /// (best-effort writes after seeding and state sync).
    fn persist(&self, must_succeed: bool) -> Result<(), Error> {
        let start = Instant::now();
        let result = self.backend.persist_store(&self.store);
        metrics::histogram!(observability::PERSIST_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        match result {
            Ok(()) => Ok(()),
            Err(e) if must_succeed => Err(Error::Backend(e.to_string())),
            Err(e) => {
                warn!("best-effort persist failed: {e}");
                Ok(())
            }
        }
    }

    /// Persist `next` through the backend, then swap it in. The live store is
    /// untouched when persistence fails, which keeps mutations all-or-nothing.
    fn commit(&mut self, next: RecordStore, op: &'static str) -> Result<(), Error> {
        let start = Instant::now();
        let result = self.backend.persist_store(&next);
        metrics::histogram!(observability::PERSIST_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        result.map_err(|e| Error::Backend(e.to_string()))?;
        self.store = next;
        metrics::counter!(observability::MUTATIONS_TOTAL, "op" => op).increment(1);
        Ok(())
    }
}
