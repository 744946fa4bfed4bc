use anyhow::{bail, Context, Result};
use compand_core::CompandSettings;
use compander::{CompandFilter, OutputBlock, PlanarBlock};
use clap::Parser;
use dasp_sample::{Sample, I24};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Compress or expand the dynamic range of a WAV file
#[derive(Parser, Debug)]
#[command(name = "compand", version)]
struct CliArgs {
    /// Input WAV file
    input: PathBuf,

    /// Output WAV file (32-bit float)
    output: PathBuf,

    /// TOML file with compand settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transfer points as in/out dB pairs, e.g. "-70/-70|-60/-20"
    #[arg(long, allow_hyphen_values = true)]
    points: Option<String>,

    /// Attack times in seconds, one per channel separated by '|'
    #[arg(long)]
    attacks: Option<String>,

    /// Decay times in seconds, one per channel separated by '|'
    #[arg(long)]
    decays: Option<String>,

    /// Soft-knee radius in dB
    #[arg(long, allow_negative_numbers = true)]
    soft_knee: Option<f64>,

    /// Output gain in dB
    #[arg(long, allow_negative_numbers = true)]
    gain: Option<f64>,

    /// Initial envelope level in dB
    #[arg(long, allow_negative_numbers = true)]
    volume: Option<f64>,

    /// Look-ahead delay in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Frames per processing block
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..))]
    block: u32,
}

/// Load settings from the optional config file, then apply command line overrides
fn load_settings(args: &CliArgs) -> Result<CompandSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            CompandSettings::from_toml_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => CompandSettings::default(),
    };

    if let Some(points) = &args.points {
        settings.points = points.clone();
    }
    if let Some(attacks) = &args.attacks {
        settings.attacks = attacks.clone();
    }
    if let Some(decays) = &args.decays {
        settings.decays = decays.clone();
    }
    settings.soft_knee = args.soft_knee.unwrap_or(settings.soft_knee);
    settings.gain = args.gain.unwrap_or(settings.gain);
    settings.volume = args.volume.unwrap_or(settings.volume);
    settings.delay = args.delay.unwrap_or(settings.delay);

    settings.validate()?;
    Ok(settings)
}

/// Read every sample of a WAV file as interleaved f64 in [-1, 1]
fn read_wav(path: &Path) -> Result<(hound::WavSpec, Vec<f64>)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    let samples: Result<Vec<f64>, hound::Error> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v.to_sample::<f64>()))
            .collect(),
        (hound::SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v.to_sample::<f64>()))
            .collect(),
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v.to_sample::<f64>()))
            .collect(),
        (hound::SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| I24::new_unchecked(v).to_sample::<f64>()))
            .collect(),
        (hound::SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v.to_sample::<f64>()))
            .collect(),
        (format, bits) => bail!("Unsupported WAV format: {:?} {} bit", format, bits),
    };

    let samples = samples.with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok((spec, samples))
}

fn write_blocks(
    writer: &mut hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    blocks: &[OutputBlock],
) -> Result<usize> {
    let mut frames = 0;
    for block in blocks {
        for sample in block.to_interleaved() {
            writer.write_sample(sample.to_sample::<f32>())?;
        }
        frames += block.num_samples();
    }
    Ok(frames)
}

fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let (spec, samples) = read_wav(&args.input)?;
    let channels = spec.channels as usize;

    tracing::info!(
        "Input {}: {} channel(s), {} Hz, {} frames",
        args.input.display(),
        channels,
        spec.sample_rate,
        samples.len() / channels.max(1)
    );

    let mut filter = CompandFilter::new(settings);
    filter.configure(channels, spec.sample_rate)?;

    let out_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.output, out_spec)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let mut frames_out = 0;
    for chunk in samples.chunks(args.block as usize * channels) {
        let block = PlanarBlock::from_interleaved(chunk, channels)?;
        if let Some(out) = filter.filter_block(block)? {
            frames_out += write_blocks(&mut writer, std::slice::from_ref(&out))?;
        }
    }

    let tail = filter.finish()?;
    frames_out += write_blocks(&mut writer, &tail)?;
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", args.output.display()))?;

    tracing::info!(
        "Wrote {} frames to {} (latency {} samples)",
        frames_out,
        args.output.display(),
        filter.latency_samples()
    );

    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,compand=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("compand").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse(&["in.wav", "--delay", "0.01", "out.wav", "--block", "256"]).unwrap();
        assert_eq!(parsed.input, PathBuf::from("in.wav"));
        assert_eq!(parsed.output, PathBuf::from("out.wav"));
        assert_eq!(parsed.block, 256);
        assert_eq!(parsed.delay, Some(0.01));
        assert_eq!(parsed.gain, None);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&["in.wav"]).is_err());
        assert!(parse(&["in.wav", "out.wav", "--ratio", "4"]).is_err());
        assert!(parse(&["in.wav", "out.wav", "--gain"]).is_err());
        assert!(parse(&["in.wav", "out.wav", "--block", "0"]).is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let parsed = parse(&[
            "in.wav",
            "out.wav",
            "--points",
            "-80/-80|-20/-10",
            "--gain",
            "-3",
        ])
        .unwrap();
        let settings = load_settings(&parsed).unwrap();
        assert_eq!(settings.points, "-80/-80|-20/-10");
        assert_eq!(settings.gain, -3.0);
        assert_eq!(settings.delay, 0.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let parsed = parse(&["in.wav", "out.wav", "--volume", "6"]).unwrap();
        assert!(load_settings(&parsed).is_err());
    }
}
