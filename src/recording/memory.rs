// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Recording backed by an in-memory `channels x frames` matrix

use super::{channel_indices, ChannelId, Recording, RecordingDescriptor};
use crate::error::{FilterError, Result};
use ndarray::{s, Array2, Axis};

/// Recording holding all of its samples in memory
#[derive(Debug, Clone)]
pub struct InMemoryRecording {
    traces: Array2<f64>,
    sampling_frequency: f64,
    channel_ids: Vec<ChannelId>,
}

impl InMemoryRecording {
    /// Wrap a `channels x frames` matrix, channel ids are `0..channels`
    pub fn new(traces: Array2<f64>, sampling_frequency: f64) -> Result<Self> {
        let channel_ids = (0..traces.nrows() as ChannelId).collect();
        Self::with_channel_ids(traces, sampling_frequency, channel_ids)
    }

    /// Wrap a `channels x frames` matrix with explicit channel ids
    pub fn with_channel_ids(
        traces: Array2<f64>,
        sampling_frequency: f64,
        channel_ids: Vec<ChannelId>,
    ) -> Result<Self> {
        if !(sampling_frequency.is_finite() && sampling_frequency > 0.0) {
            return Err(FilterError::InvalidParameter(format!(
                "sampling frequency must be positive, got {}",
                sampling_frequency
            )));
        }
        if channel_ids.len() != traces.nrows() {
            return Err(FilterError::Shape(format!(
                "{} channel ids for {} trace rows",
                channel_ids.len(),
                traces.nrows()
            )));
        }
        Ok(Self {
            traces,
            sampling_frequency,
            channel_ids,
        })
    }

    /// Build a recording from one sample vector per channel
    pub fn from_channels(channels: Vec<Vec<f64>>, sampling_frequency: f64) -> Result<Self> {
        let num_channels = channels.len();
        let num_frames = channels.first().map_or(0, Vec::len);
        if channels.iter().any(|c| c.len() != num_frames) {
            return Err(FilterError::Shape(
                "all channels must have the same number of frames".to_string(),
            ));
        }
        let flat: Vec<f64> = channels.into_iter().flatten().collect();
        let traces = Array2::from_shape_vec((num_channels, num_frames), flat)
            .map_err(|e| FilterError::Shape(e.to_string()))?;
        Self::new(traces, sampling_frequency)
    }

    pub fn traces(&self) -> &Array2<f64> {
        &self.traces
    }
}

impl Recording for InMemoryRecording {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn num_frames(&self) -> usize {
        self.traces.ncols()
    }

    fn channel_ids(&self) -> &[ChannelId] {
        &self.channel_ids
    }

    fn get_traces(
        &self,
        start: usize,
        end: usize,
        channel_ids: &[ChannelId],
    ) -> Result<Array2<f64>> {
        self.validate_range(start, end)?;
        let rows = channel_indices(&self.channel_ids, channel_ids)?;
        Ok(self
            .traces
            .slice(s![.., start..end])
            .select(Axis(0), &rows))
    }

    fn describe(&self) -> RecordingDescriptor {
        RecordingDescriptor::source("in_memory", self)
    }
}
