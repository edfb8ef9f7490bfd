// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Recording abstraction
//!
//! A recording is an ordered, fixed-length, multichannel time series with a known
//! sampling frequency. Raw sources ([`InMemoryRecording`], [`WavRecording`]) and
//! decorators (the bandpass view and the caches) all implement [`Recording`], so
//! they can be stacked in any order.
//!
//! # Examples
//!
//! ```
//! use lazy_bandpass::recording::{InMemoryRecording, Recording};
//! use ndarray::Array2;
//!
//! let traces = Array2::<f64>::zeros((2, 100));
//! let recording = InMemoryRecording::new(traces, 30000.0).unwrap();
//!
//! let chunk = recording.get_traces(10, 20, &[1]).unwrap();
//! assert_eq!(chunk.dim(), (1, 10));
//! ```

pub mod memory;
pub mod wav;

pub use memory::InMemoryRecording;
pub use wav::WavRecording;

use crate::error::{FilterError, Result};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of a channel inside a recording
pub type ChannelId = u32;

/// Declarative description of a recording, sufficient for an external layer to
/// rebuild an equivalent one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDescriptor {
    /// Kind of recording (`in_memory`, `wav`, `bandpass_filter`, ...)
    pub kind: String,
    pub sampling_frequency: f64,
    pub num_frames: usize,
    pub channel_ids: Vec<ChannelId>,
    /// Backing file, for file-based sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Wrapped recording, for decorators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<RecordingDescriptor>>,
    /// Decorator parameters
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

impl RecordingDescriptor {
    /// Describe a raw recording of the given kind
    pub fn source(kind: &str, recording: &dyn Recording) -> Self {
        Self {
            kind: kind.to_string(),
            sampling_frequency: recording.sampling_frequency(),
            num_frames: recording.num_frames(),
            channel_ids: recording.channel_ids().to_vec(),
            path: None,
            parent: None,
            parameters: serde_json::Value::Null,
        }
    }

    /// Describe a decorator wrapping `parent`
    pub fn decorator(kind: &str, parent: &dyn Recording, parameters: serde_json::Value) -> Self {
        Self {
            kind: kind.to_string(),
            sampling_frequency: parent.sampling_frequency(),
            num_frames: parent.num_frames(),
            channel_ids: parent.channel_ids().to_vec(),
            path: None,
            parent: Some(Box::new(parent.describe())),
            parameters,
        }
    }
}

/// Capability shared by raw recordings and every recording decorator
///
/// Traces are returned as `channels x frames` matrices, rows ordered like the
/// requested `channel_ids`.
pub trait Recording: Send + Sync {
    /// Sampling frequency in Hz
    fn sampling_frequency(&self) -> f64;

    /// Number of frames (samples per channel)
    fn num_frames(&self) -> usize;

    /// Ordered channel identifiers
    fn channel_ids(&self) -> &[ChannelId];

    /// Read frames `[start, end)` of the given channels
    ///
    /// ### Errors
    ///
    /// * [`FilterError::OutOfBounds`] if the range is not inside `0..=num_frames`
    /// * [`FilterError::UnknownChannel`] if a channel id is not part of the recording
    fn get_traces(&self, start: usize, end: usize, channel_ids: &[ChannelId])
        -> Result<Array2<f64>>;

    /// Serializable identity of this recording
    fn describe(&self) -> RecordingDescriptor;

    fn num_channels(&self) -> usize {
        self.channel_ids().len()
    }

    /// Duration in seconds
    fn duration(&self) -> f64 {
        self.num_frames() as f64 / self.sampling_frequency()
    }

    /// Bounds policy for a requested range
    ///
    /// The default policy accepts any `start <= end <= num_frames`.
    fn validate_range(&self, start: usize, end: usize) -> Result<()> {
        if start > end || end > self.num_frames() {
            return Err(FilterError::OutOfBounds {
                start: start as i64,
                end: end as i64,
                num_frames: self.num_frames(),
            });
        }
        Ok(())
    }

    /// Read a range that may extend past either end of the recording
    ///
    /// Frames outside `0..num_frames` are clipped from the read and zero-filled,
    /// so the result always has exactly `end - start` columns.
    fn get_traces_padded(
        &self,
        start: i64,
        end: i64,
        channel_ids: &[ChannelId],
    ) -> Result<Array2<f64>> {
        if end < start {
            return Err(FilterError::OutOfBounds {
                start,
                end,
                num_frames: self.num_frames(),
            });
        }

        let num_frames = self.num_frames() as i64;
        let mut chunk = Array2::zeros((channel_ids.len(), (end - start) as usize));
        let lo = start.clamp(0, num_frames);
        let hi = end.clamp(0, num_frames);

        if hi > lo {
            let raw = self.get_traces(lo as usize, hi as usize, channel_ids)?;
            chunk
                .slice_mut(s![.., (lo - start) as usize..(hi - start) as usize])
                .assign(&raw);
        } else {
            // Nothing to read, but unknown channels are still an error
            channel_indices(self.channel_ids(), channel_ids)?;
        }

        Ok(chunk)
    }
}

/// Map requested channel ids to row indices in `available`
pub fn channel_indices(available: &[ChannelId], requested: &[ChannelId]) -> Result<Vec<usize>> {
    requested
        .iter()
        .map(|id| {
            available
                .iter()
                .position(|candidate| candidate == id)
                .ok_or(FilterError::UnknownChannel(*id))
        })
        .collect()
}

/// Split `0..num_frames` into consecutive `[start, end)` ranges of at most `chunk_size` frames
pub fn chunk_ranges(num_frames: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    let step = chunk_size.max(1);
    (0..num_frames)
        .step_by(step)
        .map(|start| (start, (start + step).min(num_frames)))
        .collect()
}

/// Read `[start, end)` by assembling whole blocks of `chunk_size` frames aligned on frame 0
///
/// Block `index` covers `[index * chunk_size, min((index + 1) * chunk_size, num_frames))`
/// and `read_block(index, block_start, block_end)` must return all of its columns,
/// `rows` rows. A frame is always taken from the same block, so overlapping
/// requests see the same values.
pub fn read_aligned_blocks<F>(
    rows: usize,
    start: usize,
    end: usize,
    num_frames: usize,
    chunk_size: usize,
    mut read_block: F,
) -> Result<Array2<f64>>
where
    F: FnMut(usize, usize, usize) -> Result<Array2<f64>>,
{
    let mut traces = Array2::zeros((rows, end.saturating_sub(start)));
    if start >= end {
        return Ok(traces);
    }

    let step = chunk_size.max(1);
    for index in start / step..=(end - 1) / step {
        let block_start = index * step;
        let block_end = ((index + 1) * step).min(num_frames);
        let block = read_block(index, block_start, block_end)?;
        if block.dim() != (rows, block_end - block_start) {
            return Err(FilterError::Shape(format!(
                "block {} is {:?}, expected ({}, {})",
                index,
                block.dim(),
                rows,
                block_end - block_start
            )));
        }

        let lo = start.max(block_start);
        let hi = end.min(block_end);
        traces
            .slice_mut(s![.., lo - start..hi - start])
            .assign(&block.slice(s![.., lo - block_start..hi - block_start]));
    }
    Ok(traces)
}
