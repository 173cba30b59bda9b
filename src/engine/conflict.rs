use crate::model::{Host, OverrideId, Span, Ts};

use super::Error;

/// Validate raw bounds and build the half-open span.
pub(crate) fn validate_bounds(start: Ts, end: Ts) -> Result<Span, Error> {
    if start >= end {
        return Err(Error::Validation("schedule start must be before its end"));
    }
    Ok(Span::new(start, end))
}

/// Check a candidate interval against a host's defined overrides.
///
/// A candidate conflicts when its start or its end falls inside an existing
/// override. A candidate that strictly contains an existing override on both
/// sides is accepted — the contained override keeps winning inside its own
/// bounds, so a short loan can be wrapped by a longer surrounding one.
/// Touching boundaries never conflict (intervals are half-open).
///
/// `excluding` skips one id so an in-place modification is not checked
/// against itself. The first conflict in id order is the one reported.
pub fn check_overlap(
    host: &Host,
    candidate: Span,
    excluding: Option<OverrideId>,
) -> Result<(), Error> {
    for (&id, existing) in &host.schedule {
        if excluding == Some(id) {
            continue;
        }
        let e = existing.span;
        if (e.start <= candidate.start && candidate.start < e.end)
            || (e.start < candidate.end && candidate.end <= e.end)
        {
            return Err(Error::Conflict {
                id,
                existing: e,
                candidate,
            });
        }
    }
    Ok(())
}
