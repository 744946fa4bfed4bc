//! Compander - envelope, gain and look-ahead delay per audio block
//!
//! Drives one [`EnvelopeFollower`] per channel against a shared
//! [`TransferCurve`]. With a delay configured, gain computed from the newest
//! sample is applied to the sample leaving the delay line.

use super::curve::TransferCurve;
use super::delay::{DelayLine, DelayPosition};
use super::envelope::EnvelopeFollower;
use crate::types::{alloc_plane, OutputBlock, PlanarBlock};
use compand_core::{CompandError, CompandResult, CompandSettings};
use tracing::{debug, info};

/// Largest block emitted per drain call
pub const DRAIN_CHUNK: usize = 2048;

/// Processing path, fixed per configuration
#[derive(Clone, Debug)]
enum Path {
    NoDelay,
    Delayed(DelayLine),
}

#[derive(Clone, Debug)]
pub struct Compander {
    curve: TransferCurve,
    states: Vec<EnvelopeFollower>,
    path: Path,
    sample_rate: u32,
    next_pts: u64,
}

#[inline]
fn apply(sample: f64, gain: f64) -> f64 {
    (sample * gain).clamp(-1.0, 1.0)
}

impl Compander {
    /// Build a compander for `channels` channels at `sample_rate`
    pub fn new(settings: &CompandSettings, channels: usize, sample_rate: u32) -> CompandResult<Self> {
        if channels == 0 {
            return Err(CompandError::InvalidChannels(channels));
        }
        if sample_rate == 0 {
            return Err(CompandError::InvalidSampleRate(sample_rate));
        }
        settings.validate()?;

        let times = settings.channel_times(channels)?;
        let curve = TransferCurve::from_settings(settings)?;

        let mut states = Vec::new();
        states
            .try_reserve_exact(channels)
            .map_err(|_| CompandError::ResourceExhausted("channel state"))?;
        states.extend(
            times
                .into_iter()
                .map(|t| EnvelopeFollower::from_times(t, sample_rate, settings.volume)),
        );

        let delay_samples = (settings.delay * sample_rate as f64).round() as usize;
        let path = if delay_samples == 0 {
            Path::NoDelay
        } else {
            Path::Delayed(DelayLine::new(channels, delay_samples)?)
        };

        info!(
            "Compander configured: {} channel(s) at {} Hz, {} segments, delay {} samples",
            channels,
            sample_rate,
            curve.segments().len(),
            delay_samples
        );

        Ok(Self {
            curve,
            states,
            path,
            sample_rate,
            next_pts: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.states.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn curve(&self) -> &TransferCurve {
        &self.curve
    }

    /// Current envelope of a channel
    pub fn envelope(&self, channel: usize) -> Option<f64> {
        self.states.get(channel).map(EnvelopeFollower::envelope)
    }

    /// Look-ahead delay in samples (0 on the undelayed path)
    pub fn delay_samples(&self) -> usize {
        match &self.path {
            Path::NoDelay => 0,
            Path::Delayed(line) => line.len(),
        }
    }

    /// Samples per channel waiting in the delay line
    pub fn pending_samples(&self) -> usize {
        match &self.path {
            Path::NoDelay => 0,
            Path::Delayed(line) => line.filled(),
        }
    }

    /// Timestamp, in samples, of the next emitted block
    pub fn next_pts(&self) -> u64 {
        self.next_pts
    }

    fn emit(&mut self, planes: Vec<Vec<f64>>, num_samples: usize) -> OutputBlock {
        let block = OutputBlock {
            planes,
            pts: self.next_pts,
            sample_rate: self.sample_rate,
        };
        self.next_pts += num_samples as u64;
        block
    }

    /// Process one block
    ///
    /// Returns `None` when nothing is ready yet (empty input, or every
    /// sample went into the delay line).
    pub fn process(&mut self, block: PlanarBlock) -> CompandResult<Option<OutputBlock>> {
        if block.num_channels() != self.channels() {
            return Err(CompandError::ChannelMismatch {
                expected: self.channels(),
                actual: block.num_channels(),
            });
        }
        let num_samples = block.num_samples();
        if num_samples == 0 {
            return Ok(None);
        }

        if matches!(self.path, Path::NoDelay) {
            self.process_nodelay(block).map(Some)
        } else {
            self.process_delayed(&block)
        }
    }

    fn process_nodelay(&mut self, mut block: PlanarBlock) -> CompandResult<OutputBlock> {
        let num_samples = block.num_samples();
        let curve = &self.curve;

        for (plane, state) in block.planes_mut().iter_mut().zip(self.states.iter_mut()) {
            for sample in plane.iter_mut() {
                let envelope = state.update(sample.abs());
                *sample = apply(*sample, curve.gain(envelope));
            }
        }

        Ok(self.emit(block.into_planes(), num_samples))
    }

    fn process_delayed(&mut self, block: &PlanarBlock) -> CompandResult<Option<OutputBlock>> {
        let Self {
            curve,
            states,
            path,
            ..
        } = &mut *self;
        let Path::Delayed(line) = path else {
            return Ok(None);
        };

        // Allocate before touching any state so a failure leaves it intact
        let out_samples = line.emitted_for(block.num_samples());
        let mut out_planes = Vec::new();
        if out_samples > 0 {
            out_planes
                .try_reserve_exact(states.len())
                .map_err(|_| CompandError::ResourceExhausted("output block"))?;
            for _ in 0..states.len() {
                out_planes.push(alloc_plane(out_samples, "output block")?);
            }
        }

        let mut end = DelayPosition::default();
        for (ch, (plane, state)) in block.planes().iter().zip(states.iter_mut()).enumerate() {
            let mut cursor = line.cursor(ch);
            for &sample in plane {
                let envelope = state.update(sample.abs());
                if let Some(delayed) = cursor.push(sample) {
                    out_planes[ch].push(apply(delayed, curve.gain(envelope)));
                }
            }
            end = cursor.position();
        }
        line.commit(end);

        if out_samples == 0 {
            return Ok(None);
        }
        Ok(Some(self.emit(out_planes, out_samples)))
    }

    /// Emit up to [`DRAIN_CHUNK`] samples left in the delay line
    ///
    /// Gain comes from each channel's last envelope. Returns `None` once the
    /// line is empty, and always on the undelayed path.
    pub fn drain(&mut self) -> CompandResult<Option<OutputBlock>> {
        let Self {
            curve,
            states,
            path,
            ..
        } = &mut *self;
        let Path::Delayed(line) = path else {
            return Ok(None);
        };
        if line.is_empty() {
            return Ok(None);
        }

        let out_samples = line.filled().min(DRAIN_CHUNK);
        let mut out_planes = Vec::new();
        out_planes
            .try_reserve_exact(states.len())
            .map_err(|_| CompandError::ResourceExhausted("drain block"))?;
        for _ in 0..states.len() {
            out_planes.push(alloc_plane(out_samples, "drain block")?);
        }

        let mut end = line.position();
        for (ch, (out, state)) in out_planes.iter_mut().zip(states.iter()).enumerate() {
            let gain = curve.gain(state.envelope());
            let mut cursor = line.cursor(ch);
            out.extend(
                std::iter::from_fn(|| cursor.pop())
                    .take(out_samples)
                    .map(|s| apply(s, gain)),
            );
            end = cursor.position();
        }
        line.commit(end);

        debug!(
            "Drained {} samples, {} left",
            out_samples,
            line.filled()
        );

        Ok(Some(self.emit(out_planes, out_samples)))
    }
}
