//! Outbound ports for the operator API.

/// Time source trait for testability.
pub trait TimeSource: Send + Sync {
    /// Current time as Unix milliseconds.
    fn now(&self) -> u64;
}

/// System time implementation.
#[derive(Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
