//! Process exit codes reported by the `egrun` binary.

pub const SUCCESS: i32 = 0;
pub const RUN_FAILURE: i32 = 1;
pub const USAGE: i32 = 2;
pub const HOST_SETUP: i32 = 3;
pub const HOST_CALL: i32 = 4;
pub const EXTRACTION: i32 = 5;
pub const INTERNAL: i32 = 6;

/// Exit code of a finished child, with signals mapped to `128 + signal` on unix.
pub fn normalize_exit(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            code
        } else if let Some(sig) = status.signal() {
            128 + sig
        } else {
            1
        }
    }
    #[cfg(windows)]
    {
        status.code().unwrap_or(1)
    }
}
