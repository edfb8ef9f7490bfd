// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bandpass filter parameters

use crate::error::{FilterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filtering algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterKind {
    /// Multiplication by an erf-shaped kernel in the frequency domain
    #[default]
    #[serde(rename = "fft", alias = "spectral")]
    Spectral,
    /// Zero-phase Butterworth filtering in the time domain
    #[serde(rename = "butter", alias = "recursive")]
    Recursive,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Spectral => write!(f, "fft"),
            FilterKind::Recursive => write!(f, "butter"),
        }
    }
}

/// Immutable description of a bandpass filter
///
/// `freq_wid` only shapes the spectral kernel and `order` only the Butterworth
/// design. `chunk_size` is the length of the frame-0 aligned blocks a view
/// filters, and the block size its caches are filled with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandpassParameters {
    /// High-pass cutoff in Hz (0 disables the high-pass edge of the spectral kernel)
    pub freq_min: f64,
    /// Low-pass cutoff in Hz (0 disables the low-pass edge of the spectral kernel)
    pub freq_max: f64,
    /// Width of the low-pass roll-off in Hz
    pub freq_wid: f64,
    pub filter_type: FilterKind,
    pub order: usize,
    pub chunk_size: usize,
}

impl Default for BandpassParameters {
    fn default() -> Self {
        Self {
            freq_min: 300.0,
            freq_max: 6000.0,
            freq_wid: 1000.0,
            filter_type: FilterKind::Spectral,
            order: 3,
            chunk_size: 30000,
        }
    }
}

impl BandpassParameters {
    pub fn new(freq_min: f64, freq_max: f64) -> Self {
        Self {
            freq_min,
            freq_max,
            ..Self::default()
        }
    }

    pub fn with_freq_wid(mut self, freq_wid: f64) -> Self {
        self.freq_wid = freq_wid;
        self
    }

    pub fn with_filter_type(mut self, filter_type: FilterKind) -> Self {
        self.filter_type = filter_type;
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check ranges that do not depend on the recording
    ///
    /// The Butterworth band is checked against the Nyquist frequency by the designer.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("freq_min", self.freq_min), ("freq_max", self.freq_max)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FilterError::InvalidParameter(format!(
                    "{} must be a non-negative frequency, got {}",
                    name, value
                )));
            }
        }
        if !(self.freq_wid.is_finite() && self.freq_wid > 0.0) {
            return Err(FilterError::InvalidParameter(format!(
                "freq_wid must be positive, got {}",
                self.freq_wid
            )));
        }
        if self.chunk_size == 0 {
            return Err(FilterError::InvalidParameter(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.filter_type == FilterKind::Recursive && self.order == 0 {
            return Err(FilterError::InvalidParameter(
                "filter order must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
