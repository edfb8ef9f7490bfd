// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use approx::assert_abs_diff_eq;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use lazy_bandpass::recording::{chunk_ranges, wav::WavSink};
use lazy_bandpass::{bandpass_filter, BandpassParameters, CachePolicy, Recording, WavRecording};
use std::sync::Arc;
use tempfile::tempdir;

const SAMPLE_RATE: u32 = 20000;

fn write_test_wav(path: &std::path::Path, frames: usize) -> Result<()> {
    let spec = WavSpec {
        channels: 3,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for i in 0..frames {
        let t = i as f64 / SAMPLE_RATE as f64;
        for freq in [50.0, 800.0, 2500.0] {
            let value = 0.5 * (2.0 * std::f64::consts::PI * freq * t).sin();
            writer.write_sample((value * i16::MAX as f64) as i16)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_chunked_output_matches_direct_reads() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("input.wav");
    let output = dir.path().join("output.wav");
    write_test_wav(&input, 12000)?;

    let recording = Arc::new(WavRecording::open(&input)?);
    assert_eq!(recording.num_channels(), 3);
    assert_eq!(recording.sampling_frequency(), SAMPLE_RATE as f64);

    let parameters = BandpassParameters::new(300.0, 6000.0).with_chunk_size(3500);
    let filtered = bandpass_filter(recording, parameters, CachePolicy::PerChunk)?;

    // Stream channels 2 and 1 to the output, as the command line tool does
    let channel_ids = [2, 1];
    let mut sink = WavSink::create(&output, SAMPLE_RATE, channel_ids.len())?;
    for (start, end) in chunk_ranges(filtered.num_frames(), parameters.chunk_size) {
        sink.write_block(&filtered.get_traces(start, end, &channel_ids)?)?;
    }
    sink.finalize()?;

    let mut reader = WavReader::open(&output)?;
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_format, SampleFormat::Float);
    let written: Vec<f32> = reader.samples::<f32>().collect::<Result<_, _>>()?;
    assert_eq!(written.len(), 2 * 12000);

    // Compare the middle of the file with one direct read
    let direct = filtered.get_traces(4000, 8000, &channel_ids)?;
    for (offset, frame) in direct.columns().into_iter().enumerate() {
        let at = (4000 + offset) * 2;
        assert_abs_diff_eq!(written[at] as f64, frame[0], epsilon = 1e-3);
        assert_abs_diff_eq!(written[at + 1] as f64, frame[1], epsilon = 1e-3);
    }
    Ok(())
}

#[test]
fn test_wav_recording_describes_its_file() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("described.wav");
    write_test_wav(&input, 100)?;

    let recording = WavRecording::open(&input)?;
    let descriptor = recording.describe();
    assert_eq!(descriptor.kind, "wav");
    assert_eq!(descriptor.path.as_deref(), Some(input.as_path()));
    assert_eq!(descriptor.num_frames, 100);
    Ok(())
}
