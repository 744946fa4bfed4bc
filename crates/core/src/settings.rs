use crate::error::{CompandError, CompandResult};
use crate::models::{parse_points, parse_time_list, Breakpoint};
use serde::{Deserialize, Serialize};

/// Allowed range of the soft-knee radius in dB
pub const SOFT_KNEE_RANGE: (f64, f64) = (0.01, 900.0);
/// Allowed range of the output gain in dB
pub const GAIN_RANGE: (f64, f64) = (-900.0, 900.0);
/// Allowed range of the initial volume in dB
pub const VOLUME_RANGE: (f64, f64) = (-900.0, 0.0);
/// Allowed range of the look-ahead delay in seconds
pub const DELAY_RANGE: (f64, f64) = (0.0, 20.0);

/// Compander configuration
///
/// Field names and defaults follow the filter's option table; list options
/// keep their `|`-separated string form so a settings file reads the same as
/// a filter argument string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompandSettings {
    /// Attack time constants in seconds, one per channel
    pub attacks: String,
    /// Decay time constants in seconds, one per channel
    pub decays: String,
    /// Transfer function points as `in/out` dB pairs
    pub points: String,
    /// Corner rounding radius in dB
    pub soft_knee: f64,
    /// Output gain in dB
    pub gain: f64,
    /// Initial envelope level in dB
    pub volume: f64,
    /// Look-ahead delay in seconds
    pub delay: f64,
}

impl Default for CompandSettings {
    fn default() -> Self {
        Self {
            attacks: "0.3".to_string(),
            decays: "0.8".to_string(),
            points: "-70/-70|-60/-20".to_string(),
            soft_knee: 0.01,
            gain: 0.0,
            volume: 0.0,
            delay: 0.0,
        }
    }
}

/// Attack and decay time constants for a single channel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelTimes {
    pub attack: f64,
    pub decay: f64,
}

fn check_range(option: &'static str, value: f64, (min, max): (f64, f64)) -> CompandResult<()> {
    if value.is_nan() || value < min || value > max {
        return Err(CompandError::OutOfRange {
            option,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl CompandSettings {
    /// Load settings from a TOML document and validate them
    pub fn from_toml_str(source: &str) -> CompandResult<Self> {
        let settings: CompandSettings =
            toml::from_str(source).map_err(|e| CompandError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to TOML
    pub fn to_toml_string(&self) -> CompandResult<String> {
        toml::to_string(self).map_err(|e| CompandError::Settings(e.to_string()))
    }

    /// Check scalar ranges and that every list option parses
    pub fn validate(&self) -> CompandResult<()> {
        check_range("soft-knee", self.soft_knee, SOFT_KNEE_RANGE)?;
        check_range("gain", self.gain, GAIN_RANGE)?;
        check_range("volume", self.volume, VOLUME_RANGE)?;
        check_range("delay", self.delay, DELAY_RANGE)?;
        self.breakpoints()?;
        self.attack_times()?;
        self.decay_times()?;
        Ok(())
    }

    /// Parsed transfer points
    pub fn breakpoints(&self) -> CompandResult<Vec<Breakpoint>> {
        parse_points(&self.points)
    }

    /// Parsed attack times in seconds
    pub fn attack_times(&self) -> CompandResult<Vec<f64>> {
        parse_time_list(&self.attacks, "attack")
    }

    /// Parsed decay times in seconds
    pub fn decay_times(&self) -> CompandResult<Vec<f64>> {
        parse_time_list(&self.decays, "decay")
    }

    /// Resolve attack/decay times for each of `channels` channels
    ///
    /// Fewer entries than channels are broadcast: the last attack/decay pair
    /// applies to every remaining channel.
    pub fn channel_times(&self, channels: usize) -> CompandResult<Vec<ChannelTimes>> {
        if channels == 0 {
            return Err(CompandError::InvalidChannels(channels));
        }

        let attacks = self.attack_times()?;
        let decays = self.decay_times()?;

        if attacks.len() > channels || decays.len() > channels {
            return Err(CompandError::TooManyTimes {
                count: attacks.len().max(decays.len()),
                channels,
            });
        }
        if attacks.len() != decays.len() {
            return Err(CompandError::AttackDecayMismatch {
                attacks: attacks.len(),
                decays: decays.len(),
            });
        }
        if attacks.len() < channels {
            tracing::warn!(
                "{} attack/decay pair(s) for {} channels, broadcasting the last pair",
                attacks.len(),
                channels
            );
        }

        // Both lists are non-empty here: splitting never yields zero items.
        let last = attacks.len() - 1;
        Ok((0..channels)
            .map(|ch| ChannelTimes {
                attack: attacks[ch.min(last)],
                decay: decays[ch.min(last)],
            })
            .collect())
    }
}
