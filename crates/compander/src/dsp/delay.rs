//! Fixed-length look-ahead delay line
//!
//! One circular buffer per channel holding raw (pre-gain) samples. All
//! channels share a single write position and fill count: every block feeds
//! the same number of samples to each channel, so the per-channel cursors
//! always end at the same place.

use compand_core::{CompandError, CompandResult};

/// Shared position of the delay line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DelayPosition {
    /// Slot the next incoming sample is written to
    pub write_index: usize,
    /// Number of queued samples, never more than the line length
    pub filled: usize,
}

#[derive(Clone, Debug)]
pub struct DelayLine {
    planes: Vec<Vec<f64>>,
    len: usize,
    position: DelayPosition,
}

impl DelayLine {
    /// Allocate a zeroed line of `len` samples for each of `channels` channels
    pub fn new(channels: usize, len: usize) -> CompandResult<Self> {
        let mut planes = Vec::new();
        planes
            .try_reserve_exact(channels)
            .map_err(|_| CompandError::ResourceExhausted("delay buffer"))?;

        for _ in 0..channels {
            let mut plane = Vec::new();
            plane
                .try_reserve_exact(len)
                .map_err(|_| CompandError::ResourceExhausted("delay buffer"))?;
            plane.resize(len, 0.0);
            planes.push(plane);
        }

        Ok(Self {
            planes,
            len,
            position: DelayPosition::default(),
        })
    }

    /// Delay length in samples
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.position.filled == 0
    }

    #[cfg(test)]
    fn is_full(&self) -> bool {
        self.position.filled >= self.len
    }

    /// Number of queued samples per channel
    pub fn filled(&self) -> usize {
        self.position.filled
    }

    pub fn position(&self) -> DelayPosition {
        self.position
    }

    /// Slot holding the oldest queued sample
    #[cfg(test)]
    fn read_index(&self) -> usize {
        read_index(self.position, self.len)
    }

    /// How many outputs feeding `incoming` samples per channel will produce
    pub fn emitted_for(&self, incoming: usize) -> usize {
        incoming.saturating_sub(self.len - self.position.filled)
    }

    /// Cursor over one channel, starting at the shared position
    pub fn cursor(&mut self, channel: usize) -> PlaneCursor<'_> {
        PlaneCursor {
            buf: &mut self.planes[channel],
            position: self.position,
        }
    }

    /// Store the position reached by the cursors of a block
    pub fn commit(&mut self, position: DelayPosition) {
        debug_assert!(position.filled <= self.len);
        self.position = position;
    }
}

#[inline]
fn read_index(position: DelayPosition, len: usize) -> usize {
    (position.write_index + len - position.filled) % len
}

/// Per-channel view of a [`DelayLine`]
pub struct PlaneCursor<'a> {
    buf: &'a mut [f64],
    position: DelayPosition,
}

impl PlaneCursor<'_> {
    /// Queue `sample`, returning the oldest sample once the line is full
    #[inline]
    pub fn push(&mut self, sample: f64) -> Option<f64> {
        let len = self.buf.len();
        let slot = self.position.write_index;

        let delayed = if self.position.filled >= len {
            Some(self.buf[slot])
        } else {
            self.position.filled += 1;
            None
        };

        self.buf[slot] = sample;
        self.position.write_index = if slot + 1 >= len { 0 } else { slot + 1 };
        delayed
    }

    /// Take the oldest queued sample without queueing a new one
    #[inline]
    pub fn pop(&mut self) -> Option<f64> {
        if self.position.filled == 0 {
            return None;
        }
        let slot = read_index(self.position, self.buf.len());
        self.position.filled -= 1;
        Some(self.buf[slot])
    }

    pub fn position(&self) -> DelayPosition {
        self.position
    }
}
