//! Reporting fatal errors and exiting.

use tracing::error;

/// Process exit codes.
pub enum ExitCode {
    /// A pipeline stage failed or was handed invalid input.
    Failure = 1,
}

/// Logs `message` at the error level and exits with `code`.
pub fn exit<I>(message: I, code: ExitCode) -> !
where
    I: tracing::Value,
{
    error!(message);
    std::process::exit(code as i32);
}
