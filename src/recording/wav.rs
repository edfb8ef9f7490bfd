// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! WAV file recordings
//!
//! The whole file is decoded once with `hound`; integer samples are scaled to
//! `[-1, 1)`. Channel ids are the interleaving positions `0..channels`.

use super::{ChannelId, InMemoryRecording, Recording, RecordingDescriptor};
use crate::error::{FilterError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Recording decoded from a WAV file
#[derive(Debug, Clone)]
pub struct WavRecording {
    path: PathBuf,
    spec: WavSpec,
    samples: InMemoryRecording,
}

impl WavRecording {
    /// Open and decode a WAV file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        debug!(
            "Reading WAV file {:?}: {} Hz, {} channels, {} bits",
            path, spec.sample_rate, spec.channels, spec.bits_per_sample
        );

        let interleaved: Vec<f64> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        if channels == 0 || interleaved.len() % channels != 0 {
            return Err(FilterError::Shape(format!(
                "{} samples cannot be split into {} channels",
                interleaved.len(),
                channels
            )));
        }

        let frames = interleaved.len() / channels;
        // Interleaved frames -> channels x frames
        let traces = Array2::from_shape_vec((frames, channels), interleaved)
            .map_err(|e| FilterError::Shape(e.to_string()))?
            .reversed_axes()
            .as_standard_layout()
            .into_owned();

        Ok(Self {
            path: path.to_path_buf(),
            spec,
            samples: InMemoryRecording::new(traces, spec.sample_rate as f64)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }
}

impl Recording for WavRecording {
    fn sampling_frequency(&self) -> f64 {
        self.samples.sampling_frequency()
    }

    fn num_frames(&self) -> usize {
        self.samples.num_frames()
    }

    fn channel_ids(&self) -> &[ChannelId] {
        self.samples.channel_ids()
    }

    fn get_traces(
        &self,
        start: usize,
        end: usize,
        channel_ids: &[ChannelId],
    ) -> Result<Array2<f64>> {
        self.samples.get_traces(start, end, channel_ids)
    }

    fn describe(&self) -> RecordingDescriptor {
        let mut descriptor = RecordingDescriptor::source("wav", self);
        descriptor.path = Some(self.path.clone());
        descriptor
    }
}

/// Incremental writer of `channels x frames` blocks to a 32-bit float WAV file
pub struct WavSink {
    writer: WavWriter<std::io::BufWriter<std::fs::File>>,
    channels: usize,
}

impl WavSink {
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32, channels: usize) -> Result<Self> {
        let channel_count = u16::try_from(channels).map_err(|_| {
            FilterError::InvalidParameter(format!("{} channels do not fit in a WAV file", channels))
        })?;
        let spec = WavSpec {
            channels: channel_count,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            channels,
        })
    }

    /// Append a block, interleaving its rows
    pub fn write_block(&mut self, block: &Array2<f64>) -> Result<()> {
        if block.nrows() != self.channels {
            return Err(FilterError::Shape(format!(
                "expected {} channels, got {}",
                self.channels,
                block.nrows()
            )));
        }
        for frame in block.columns() {
            for &sample in frame {
                self.writer.write_sample(sample as f32)?;
            }
        }
        Ok(())
    }

    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}
