//! Structural size caps enforced at mutation boundaries.

/// Max length of a host or cloud identifier.
pub const MAX_IDENT_LEN: usize = 255;

/// Max length of a cloud description.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Max defined overrides per host.
pub const MAX_OVERRIDES_PER_HOST: usize = 4096;
