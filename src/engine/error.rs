use crate::model::{OverrideId, Span};
use crate::timefmt::format_stamp;

/// What kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Host,
    Cloud,
    Override,
    Backend,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Host => write!(f, "host"),
            Entity::Cloud => write!(f, "cloud"),
            Entity::Override => write!(f, "override"),
            Entity::Backend => write!(f, "backend"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Parse(String),
    NotFound(Entity, String),
    Conflict {
        id: OverrideId,
        existing: Span,
        candidate: Span,
    },
    Validation(&'static str),
    Limit(&'static str),
    Backend(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(s) => write!(f, "bad timestamp: {s}"),
            Error::NotFound(entity, name) => write!(f, "{entity} \"{name}\" is not defined"),
            Error::Conflict {
                id,
                existing,
                candidate,
            } => {
                write!(
                    f,
                    "requested schedule [{}, {}) conflicts with override {id} [{}, {})",
                    format_stamp(candidate.start),
                    format_stamp(candidate.end),
                    format_stamp(existing.start),
                    format_stamp(existing.end),
                )
            }
            Error::Validation(msg) => write!(f, "{msg}"),
            Error::Limit(msg) => write!(f, "limit exceeded: {msg}"),
            Error::Backend(e) => write!(f, "backend error: {e}"),
        }
    }
}

impl std::error::Error for Error {}
