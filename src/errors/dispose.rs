use alloc::vec::Vec;

/// Errors raised by teardowns while disposing a container or scope.
/// Every owned instance had a teardown attempt before this error was returned.
#[derive(thiserror::Error, Debug)]
#[error("Failed to dispose one or more instances")]
pub struct DisposeError {
    pub errors: Vec<anyhow::Error>,
}
