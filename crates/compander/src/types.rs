use compand_core::{CompandError, CompandResult};

/// Planar 64-bit float audio, one plane per channel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanarBlock {
    planes: Vec<Vec<f64>>,
}

impl PlanarBlock {
    /// Create a block from planes of equal length
    pub fn new(planes: Vec<Vec<f64>>) -> CompandResult<Self> {
        if let Some(first) = planes.first() {
            if planes.iter().any(|p| p.len() != first.len()) {
                return Err(CompandError::RaggedBlock);
            }
        }
        Ok(Self { planes })
    }

    /// Single-channel block
    pub fn mono(samples: Vec<f64>) -> Self {
        Self {
            planes: vec![samples],
        }
    }

    /// Split interleaved frames (LRLR...) into planes
    pub fn from_interleaved(frames: &[f64], channels: usize) -> CompandResult<Self> {
        if channels == 0 {
            return Err(CompandError::InvalidChannels(channels));
        }
        if frames.len() % channels != 0 {
            return Err(CompandError::RaggedBlock);
        }

        let num_samples = frames.len() / channels;
        let planes = (0..channels)
            .map(|ch| {
                frames
                    .iter()
                    .skip(ch)
                    .step_by(channels)
                    .copied()
                    .collect::<Vec<f64>>()
            })
            .collect::<Vec<_>>();
        debug_assert!(planes.iter().all(|p| p.len() == num_samples));

        Ok(Self { planes })
    }

    pub fn num_channels(&self) -> usize {
        self.planes.len()
    }

    /// Samples per channel
    pub fn num_samples(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    pub fn planes(&self) -> &[Vec<f64>] {
        &self.planes
    }

    pub fn plane(&self, channel: usize) -> Option<&[f64]> {
        self.planes.get(channel).map(Vec::as_slice)
    }

    pub(crate) fn planes_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.planes
    }

    pub fn into_planes(self) -> Vec<Vec<f64>> {
        self.planes
    }
}

/// Processed audio with its presentation timestamp
#[derive(Clone, Debug, PartialEq)]
pub struct OutputBlock {
    /// One plane per channel, all the same length
    pub planes: Vec<Vec<f64>>,
    /// Timestamp in samples since the start of the stream
    pub pts: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl OutputBlock {
    pub fn num_channels(&self) -> usize {
        self.planes.len()
    }

    /// Samples per channel
    pub fn num_samples(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    /// Timestamp in seconds
    pub fn pts_seconds(&self) -> f64 {
        self.pts as f64 / self.sample_rate as f64
    }

    /// Duration of this block in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate as f64
    }

    /// Interleave planes into frames (LRLR...)
    pub fn to_interleaved(&self) -> Vec<f64> {
        let channels = self.num_channels();
        let mut frames = Vec::with_capacity(channels * self.num_samples());
        for i in 0..self.num_samples() {
            for plane in &self.planes {
                frames.push(plane[i]);
            }
        }
        frames
    }
}

/// Allocate an empty plane able to hold `len` samples without reallocating
pub(crate) fn alloc_plane(len: usize, what: &'static str) -> CompandResult<Vec<f64>> {
    let mut plane = Vec::new();
    plane
        .try_reserve_exact(len)
        .map_err(|_| CompandError::ResourceExhausted(what))?;
    Ok(plane)
}
