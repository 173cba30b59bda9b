//! Tracks which cloud owns each host in a shared pool over time: a long-lived
//! default assignment per host, short time-bounded overrides on top, and an
//! append-only history of past defaults and cloud metadata. The engine
//! resolves ownership at arbitrary instants, guards the schedule against
//! overlapping overrides, and reports pool state; loading, persistence, and
//! the physical realization of moves go through a pluggable backend.

pub mod backend;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod timefmt;
