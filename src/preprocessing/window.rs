// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Padded read / filter / crop
//!
//! Both filters distort the edges of whatever window they transform. A request
//! for `[start, end)` is therefore served by filtering
//! `[start - pad, end + pad)` and keeping only the middle `end - start` samples.
//! The first and last `pad` samples of a recording have no real neighbours and
//! keep some edge distortion.

use super::engine::ChunkFilter;
use crate::error::{FilterError, Result};
use crate::recording::{ChannelId, Recording};
use ndarray::{s, Array2};

/// Guard band added on each side of a request, in samples
pub const PADDING: usize = 3000;

/// Source window `[start - pad, end + pad)` for a request `[start, end)`
pub fn padded_window(start: usize, end: usize, pad: usize) -> (i64, i64) {
    (start as i64 - pad as i64, end as i64 + pad as i64)
}

/// Keep the columns of `filtered` (which starts at frame `window_start`) that cover `[start, end)`
pub fn crop(filtered: &Array2<f64>, window_start: i64, start: usize, end: usize) -> Result<Array2<f64>> {
    let offset = start as i64 - window_start;
    let len = end.saturating_sub(start);
    if offset < 0 || offset as usize + len > filtered.ncols() {
        return Err(FilterError::Shape(format!(
            "cannot crop [{}, {}) from a {}-sample window starting at {}",
            start,
            end,
            filtered.ncols(),
            window_start
        )));
    }
    let offset = offset as usize;
    Ok(filtered.slice(s![.., offset..offset + len]).to_owned())
}

/// Serves filtered reads from a recording through a [`ChunkFilter`]
pub struct PaddedWindowReader<'a> {
    recording: &'a dyn Recording,
    filter: &'a ChunkFilter,
    pad: usize,
}

impl<'a> PaddedWindowReader<'a> {
    pub fn new(recording: &'a dyn Recording, filter: &'a ChunkFilter) -> Self {
        Self {
            recording,
            filter,
            pad: PADDING,
        }
    }

    /// Use a different guard band
    pub fn with_padding(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    pub fn padding(&self) -> usize {
        self.pad
    }

    /// Filtered samples for `[start, end)`, exactly `end - start` columns
    ///
    /// The padded range is passed as is to the recording, whose bounds policy
    /// decides what lies beyond its frames.
    pub fn read(&self, start: usize, end: usize, channel_ids: &[ChannelId]) -> Result<Array2<f64>> {
        let (window_start, window_end) = padded_window(start, end, self.pad);
        let padded_chunk = self
            .recording
            .get_traces_padded(window_start, window_end, channel_ids)?;
        let filtered = self.filter.filter(padded_chunk.view())?;
        crop(&filtered, window_start, start, end)
    }
}
