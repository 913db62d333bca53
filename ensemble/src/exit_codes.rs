//! Stable exit codes for the ensemble CLI.

/// Run finished and its record was written.
pub const OK: i32 = 0;
/// The run aborted (completion failure or I/O error).
pub const FAILURE: i32 = 1;
/// Configuration is unusable (missing API key, invalid config file).
pub const INVALID_CONFIG: i32 = 2;
