//! Exit codes for CLI operations
//!
//! These follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - bad Application, option or config file
pub const CONFIG_ERROR: i32 = 2;

/// Render error - helm/kustomize failed or output rejected
pub const RENDER_ERROR: i32 = 3;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments (sysexits.h EX_USAGE)
pub const USAGE_ERROR: i32 = 64;

/// Interrupted by Ctrl-C (128 + SIGINT)
pub const CANCELLED: i32 = 130;
