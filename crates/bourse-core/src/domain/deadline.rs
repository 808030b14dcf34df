use std::time::{Duration, Instant};

use crate::IngestError;

const CHECK_EVERY_ROWS: usize = 256;

/// Cooperative per-file time budget, checked from inside row loops.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn start(limit_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            limit: Duration::from_millis(limit_ms),
        }
    }

    pub fn check(&self) -> Result<(), IngestError> {
        if self.started.elapsed() > self.limit {
            return Err(IngestError::Timeout {
                limit_ms: u64::try_from(self.limit.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }

    /// Check only every few hundred rows.
    pub fn tick(&self, row: usize) -> Result<(), IngestError> {
        if row % CHECK_EVERY_ROWS == 0 {
            self.check()?;
        }
        Ok(())
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_deadline_reports_timeout() {
        let deadline = Deadline::start(0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            deadline.tick(0),
            Err(IngestError::Timeout { limit_ms: 0 })
        ));
        assert!(deadline.tick(1).is_ok());
    }

    #[test]
    fn generous_deadline_passes() {
        assert!(Deadline::start(60_000).check().is_ok());
    }
}
