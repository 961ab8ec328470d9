//! exit codes for formgate commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

/// command completed successfully (conditions passed / gate proceeds)
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// conditions did not pass, or the gate blocks the action
pub const NOT_PASSED: i32 = 2;

/// conditions or submission file could not be parsed
pub const INVALID_INPUT: i32 = 3;

/// configuration file error
pub const CONFIG_ERROR: i32 = 4;
