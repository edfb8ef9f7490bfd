// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//! Bandpass filter utility
//!
//! Reads a WAV file, filters it chunk by chunk through a lazily filtered view
//! and writes the result as a 32-bit float WAV file.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lazy_bandpass::config::{output_config_schema, BandpassConfig};
use lazy_bandpass::recording::{chunk_ranges, wav::WavSink};
use lazy_bandpass::{bandpass_filter, CachePolicy, ChannelId, FilterKind, Recording, WavRecording};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FilterType {
    /// Erf-shaped kernel applied in the frequency domain
    Fft,
    /// Zero-phase Butterworth filter
    Butter,
}

impl From<FilterType> for FilterKind {
    fn from(filter_type: FilterType) -> Self {
        match filter_type {
            FilterType::Fft => FilterKind::Spectral,
            FilterType::Butter => FilterKind::Recursive,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Cache {
    /// Filter on every read
    None,
    /// Filter everything once into a temporary file
    File,
    /// Remember each chunk in memory
    Chunks,
}

impl From<Cache> for CachePolicy {
    fn from(cache: Cache) -> Self {
        match cache {
            Cache::None => CachePolicy::None,
            Cache::File => CachePolicy::WholeRecording,
            Cache::Chunks => CachePolicy::PerChunk,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lazy_bandpass")]
#[command(author = "Ronan Le Meillat")]
#[command(version)]
#[command(about = "Bandpass filter multichannel WAV recordings", long_about = None)]
struct Args {
    /// Input WAV file
    #[arg(short = 'i', long, required_unless_present = "show_config_schema")]
    input: Option<PathBuf>,

    /// Output WAV file
    #[arg(short = 'o', long, required_unless_present = "show_config_schema")]
    output: Option<PathBuf>,

    /// YAML configuration file (created with defaults if missing)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// High-pass cutoff in Hz
    #[arg(long)]
    freq_min: Option<f64>,

    /// Low-pass cutoff in Hz
    #[arg(long)]
    freq_max: Option<f64>,

    /// Low-pass transition width in Hz (fft filter)
    #[arg(long)]
    freq_wid: Option<f64>,

    /// Filter type
    #[arg(short = 't', long, value_enum)]
    filter_type: Option<FilterType>,

    /// Butterworth order (butter filter)
    #[arg(short = 'n', long)]
    order: Option<usize>,

    /// Frames filtered and written per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Channels to keep, comma separated (all channels when omitted)
    #[arg(short = 'l', long, value_delimiter = ',')]
    channels: Vec<ChannelId>,

    /// Caching strategy
    #[arg(long, value_enum)]
    cache: Option<Cache>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.show_config_schema {
        return output_config_schema();
    }
    let (Some(input), Some(output)) = (args.input, args.output) else {
        anyhow::bail!("--input and --output are required");
    };

    let mut config = match &args.config {
        Some(path) => BandpassConfig::from_file(path)?,
        None => BandpassConfig::default(),
    };
    config.apply_args(
        args.freq_min,
        args.freq_max,
        args.freq_wid,
        args.filter_type.map(FilterKind::from),
        args.order,
        args.chunk_size,
    );
    if let Some(cache) = args.cache {
        config.set_cache_policy(cache.into());
    }
    config.validate()?;

    info!("Reading WAV file: {:?}", input);
    let recording = Arc::new(
        WavRecording::open(&input).with_context(|| format!("Failed to open {:?}", input))?,
    );
    let spec = recording.spec();
    info!(
        "Input: {} Hz, {} bits, {} channels, {} frames",
        spec.sample_rate,
        spec.bits_per_sample,
        spec.channels,
        recording.num_frames()
    );

    let parameters = config.to_parameters();
    let filtered = bandpass_filter(recording, parameters, config.cache_policy()?)?;

    let channel_ids: Vec<ChannelId> = if args.channels.is_empty() {
        filtered.channel_ids().to_vec()
    } else {
        args.channels
    };

    info!("Writing output to {:?}", output);
    let mut sink = WavSink::create(&output, spec.sample_rate, channel_ids.len())
        .with_context(|| format!("Failed to create {:?}", output))?;
    for (start, end) in chunk_ranges(filtered.num_frames(), parameters.chunk_size) {
        debug!("Writing frames [{}, {})", start, end);
        let block = filtered.get_traces(start, end, &channel_ids)?;
        sink.write_block(&block)?;
    }
    sink.finalize()?;

    info!("Filtering complete!");
    Ok(())
}
