// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Lazily filtered view over a recording

use super::butter::RecursiveCoefficients;
use super::engine::ChunkFilter;
use super::parameters::BandpassParameters;
use super::window::PaddedWindowReader;
use crate::cache::CachePolicy;
use crate::error::Result;
use crate::recording::{
    channel_indices, read_aligned_blocks, ChannelId, Recording, RecordingDescriptor,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declarative record of how a filtered view was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandpassRecord {
    pub recording: RecordingDescriptor,
    #[serde(flatten)]
    pub parameters: BandpassParameters,
    #[serde(default)]
    pub cache: CachePolicy,
}

/// Recording whose traces are bandpass filtered on every read
///
/// Metadata (sampling frequency, frame count, channel ids) passes through from
/// the wrapped recording unchanged.
///
/// Reads are served from blocks of `chunk_size` frames aligned on frame 0.
/// Each block is filtered through its own padded window, so a given frame
/// always has the same filtered value, whatever range it was requested in.
pub struct BandpassRecording {
    recording: Arc<dyn Recording>,
    filter: ChunkFilter,
}

impl BandpassRecording {
    /// Wrap `recording`; recursive filters are designed and checked here
    pub fn new(recording: Arc<dyn Recording>, parameters: BandpassParameters) -> Result<Self> {
        let filter = ChunkFilter::new(parameters, recording.sampling_frequency())?;
        Ok(Self { recording, filter })
    }

    pub fn parameters(&self) -> &BandpassParameters {
        self.filter.parameters()
    }

    pub fn coefficients(&self) -> Option<&RecursiveCoefficients> {
        self.filter.coefficients()
    }

    pub fn is_filtered(&self) -> bool {
        true
    }

    /// Frames per aligned block
    pub fn chunk_size(&self) -> usize {
        self.parameters().chunk_size
    }

    /// The wrapped recording
    pub fn source(&self) -> &Arc<dyn Recording> {
        &self.recording
    }

    pub fn to_record(&self, cache: CachePolicy) -> BandpassRecord {
        BandpassRecord {
            recording: self.recording.describe(),
            parameters: *self.parameters(),
            cache,
        }
    }
}

impl Recording for BandpassRecording {
    fn sampling_frequency(&self) -> f64 {
        self.recording.sampling_frequency()
    }

    fn num_frames(&self) -> usize {
        self.recording.num_frames()
    }

    fn channel_ids(&self) -> &[ChannelId] {
        self.recording.channel_ids()
    }

    fn get_traces(
        &self,
        start: usize,
        end: usize,
        channel_ids: &[ChannelId],
    ) -> Result<Array2<f64>> {
        self.recording.validate_range(start, end)?;
        channel_indices(self.channel_ids(), channel_ids)?;

        let reader = PaddedWindowReader::new(self.recording.as_ref(), &self.filter);
        read_aligned_blocks(
            channel_ids.len(),
            start,
            end,
            self.num_frames(),
            self.chunk_size(),
            |_, block_start, block_end| reader.read(block_start, block_end, channel_ids),
        )
    }

    fn describe(&self) -> RecordingDescriptor {
        RecordingDescriptor::decorator(
            "bandpass_filter",
            self.recording.as_ref(),
            serde_json::to_value(self.parameters())
                .expect("bandpass parameters are plain numbers and enums"),
        )
    }
}
