use super::TimingError;

/// Running latency total for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyAccumulator {
    total_millis: u64,
    samples: usize,
}

impl LatencyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one request's elapsed time
    pub fn record(&mut self, elapsed_millis: u64) {
        self.total_millis += elapsed_millis;
        self.samples += 1;
    }

    pub fn total_millis(&self) -> u64 {
        self.total_millis
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Close the batch, checking that every issued request was timed
    pub fn finish(&self, request_count: usize) -> Result<BatchTiming, TimingError> {
        if self.samples != request_count {
            return Err(TimingError::SampleCountMismatch {
                expected: request_count,
                observed: self.samples,
            });
        }
        BatchTiming::new(self.total_millis, request_count)
    }
}

/// Total elapsed time of a batch and the number of requests it covered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTiming {
    total_elapsed_millis: u64,
    request_count: usize,
}

impl BatchTiming {
    /// Fails with [`TimingError::EmptyBatch`] when `request_count` is zero
    pub fn new(total_elapsed_millis: u64, request_count: usize) -> Result<Self, TimingError> {
        if request_count == 0 {
            return Err(TimingError::EmptyBatch);
        }
        Ok(Self {
            total_elapsed_millis,
            request_count,
        })
    }

    pub fn total_elapsed_millis(&self) -> u64 {
        self.total_elapsed_millis
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }

    /// Average latency per request, integer milliseconds
    pub fn average_millis(&self) -> u64 {
        self.total_elapsed_millis / self.request_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_uses_integer_division() {
        let timing = BatchTiming::new(1001, 20).unwrap();
        assert_eq!(timing.average_millis(), 50);
    }

    #[test]
    fn test_zero_requests_rejected() {
        assert_eq!(BatchTiming::new(0, 0), Err(TimingError::EmptyBatch));
    }

    #[test]
    fn test_finish_sums_recorded_samples() {
        let mut acc = LatencyAccumulator::new();
        for _ in 0..10 {
            acc.record(50);
        }

        let timing = acc.finish(10).unwrap();
        assert_eq!(timing.total_elapsed_millis(), 500);
        assert_eq!(timing.average_millis(), 50);
    }

    #[test]
    fn test_finish_detects_untimed_requests() {
        let mut acc = LatencyAccumulator::new();
        acc.record(10);

        assert_eq!(
            acc.finish(2),
            Err(TimingError::SampleCountMismatch {
                expected: 2,
                observed: 1,
            })
        );
    }

    #[test]
    fn test_reset_clears_total_and_samples() {
        let mut acc = LatencyAccumulator::new();
        acc.record(30);
        acc.reset();

        assert_eq!(acc.total_millis(), 0);
        assert_eq!(acc.samples(), 0);
    }
}
