use std::time::{Duration, Instant};

/// Statistics for encoder model inference.
#[derive(Debug, Clone)]
pub struct EncoderStats {
    /// Total execution time.
    pub total_time: Duration,
    /// Number of items processed.
    pub items_processed: usize,
}

impl EncoderStats {
    /// Create a new stats tracker (call at start of operation).
    pub(crate) fn start() -> EncoderStatsBuilder {
        EncoderStatsBuilder {
            start_time: Instant::now(),
        }
    }
}

/// Tracks timing from creation to `finish`.
pub(crate) struct EncoderStatsBuilder {
    start_time: Instant,
}

impl EncoderStatsBuilder {
    /// Finalize stats with the number of items processed.
    pub fn finish(self, items_processed: usize) -> EncoderStats {
        EncoderStats {
            total_time: self.start_time.elapsed(),
            items_processed,
        }
    }
}
