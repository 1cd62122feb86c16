// Active buffer: bounded, time-ordered tail of live samples

use tracing::{debug, warn};

use crate::core::format::Sample;

#[derive(Debug, Clone)]
pub struct ActiveBuffer {
    samples: Vec<Sample>,
    hold_count: usize,
}

impl ActiveBuffer {
    pub fn new(hold_count: usize) -> Self {
        Self {
            samples: Vec::new(),
            hold_count,
        }
    }

    /// Append to the tail, skipping anything not strictly newer than the
    /// current tail, then drop from the head down to `hold_count`.
    /// Returns the number of samples accepted.
    pub fn append<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut accepted = 0;
        for sample in incoming {
            if let Some(last) = self.latest_timestamp() {
                if sample.timestamp <= last {
                    warn!(
                        "Skipping out-of-order sample {} (tail is {})",
                        sample.timestamp, last
                    );
                    continue;
                }
            }
            self.samples.push(sample);
            accepted += 1;
        }

        let over = self.samples.len().saturating_sub(self.hold_count);
        if over > 0 {
            self.samples.drain(..over);
            debug!("Active buffer trimmed {} samples", over);
        }
        accepted
    }

    pub fn latest_timestamp(&self) -> Option<i64> {
        self.samples.last().map(|s| s.timestamp)
    }

    pub fn earliest_timestamp(&self) -> Option<i64> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn latest_minute(&self) -> Option<i64> {
        self.samples.last().map(Sample::minute)
    }

    pub fn earliest_minute(&self) -> Option<i64> {
        self.samples.first().map(Sample::minute)
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn hold_count(&self) -> usize {
        self.hold_count
    }
}

#[cfg(test)]
pub(crate) fn minutes(range: std::ops::RangeInclusive<i64>) -> Vec<Sample> {
    range
        .map(|m| Sample::new(m * 60, Default::default()))
        .collect()
}
