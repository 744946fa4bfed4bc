use crate::dsp::Compander;
use crate::types::{OutputBlock, PlanarBlock};
use compand_core::{CompandError, CompandResult, CompandSettings};
use tracing::{error, info};

/// Host-facing compand filter
///
/// Holds the options and, once the host has negotiated a layout, the
/// configured [`Compander`]. Reconfiguring always starts from scratch: the
/// previous state is released first and nothing is kept if the rebuild
/// fails.
pub struct CompandFilter {
    settings: CompandSettings,
    state: Option<Compander>,
}

impl CompandFilter {
    /// Create an unconfigured filter
    pub fn new(settings: CompandSettings) -> Self {
        Self {
            settings,
            state: None,
        }
    }

    pub fn settings(&self) -> &CompandSettings {
        &self.settings
    }

    /// Replace the options; takes effect on the next [`configure`](Self::configure)
    pub fn set_settings(&mut self, settings: CompandSettings) {
        self.settings = settings;
    }

    /// Build processing state for a channel count and sample rate
    pub fn configure(&mut self, channels: usize, sample_rate: u32) -> CompandResult<()> {
        self.uninit();

        match Compander::new(&self.settings, channels, sample_rate) {
            Ok(compander) => {
                self.state = Some(compander);
                Ok(())
            }
            Err(e) => {
                error!("Failed to configure compander: {}", e);
                Err(e)
            }
        }
    }

    /// Release all processing state
    pub fn uninit(&mut self) {
        self.state = None;
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    /// Configured compander, if any
    pub fn compander(&self) -> Option<&Compander> {
        self.state.as_ref()
    }

    /// Output latency in samples introduced by the look-ahead delay
    pub fn latency_samples(&self) -> usize {
        self.state.as_ref().map_or(0, Compander::delay_samples)
    }

    fn active(&mut self) -> CompandResult<&mut Compander> {
        self.state.as_mut().ok_or(CompandError::NotConfigured)
    }

    /// Process one input block
    pub fn filter_block(&mut self, block: PlanarBlock) -> CompandResult<Option<OutputBlock>> {
        self.active()?.process(block)
    }

    /// Emit the next chunk of delayed audio after end of stream
    pub fn drain(&mut self) -> CompandResult<Option<OutputBlock>> {
        self.active()?.drain()
    }

    /// Drain everything left in the delay line
    pub fn finish(&mut self) -> CompandResult<Vec<OutputBlock>> {
        let compander = self.active()?;
        let mut blocks = Vec::new();
        while let Some(block) = compander.drain()? {
            blocks.push(block);
        }
        if !blocks.is_empty() {
            info!(
                "Flushed {} delayed samples in {} block(s)",
                blocks.iter().map(OutputBlock::num_samples).sum::<usize>(),
                blocks.len()
            );
        }
        Ok(blocks)
    }
}

impl Default for CompandFilter {
    fn default() -> Self {
        Self::new(CompandSettings::default())
    }
}
