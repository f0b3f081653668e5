//! Stable exit codes for the `actionrun` binary.

/// The run completed, found no trigger, or was skipped.
pub const OK: i32 = 0;
/// The run failed, or configuration could not be loaded.
pub const FAILED: i32 = 1;
