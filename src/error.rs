// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types shared by recordings, filters and caches

use crate::recording::ChannelId;
use thiserror::Error;

/// Errors raised while building or reading a filtered recording
#[derive(Error, Debug)]
pub enum FilterError {
    /// The recursive filter design has a pole on or outside the unit circle
    #[error("Filter is not stable: largest pole magnitude is {max_pole_radius:.6}")]
    UnstableFilter { max_pole_radius: f64 },

    #[error(
        "Invalid band [{freq_min}, {freq_max}] Hz for a sampling frequency of {sampling_frequency} Hz"
    )]
    InvalidBand {
        freq_min: f64,
        freq_max: f64,
        sampling_frequency: f64,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Whole-recording and per-chunk caching were both requested
    #[error("cache_to_file and cache_chunks cannot both be enabled")]
    IncompatibleCaching,

    #[error("Filter design failed: {0}")]
    Design(String),

    #[error("Frame range [{start}, {end}) is outside the recording (0..{num_frames})")]
    OutOfBounds {
        start: i64,
        end: i64,
        num_frames: usize,
    },

    #[error("Channel id {0} not found in recording")]
    UnknownChannel(ChannelId),

    #[error("Malformed chunk: {0}")]
    Shape(String),

    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl FilterError {
    /// True for errors raised while constructing a view rather than reading from it
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FilterError::UnstableFilter { .. }
                | FilterError::InvalidBand { .. }
                | FilterError::InvalidParameter(_)
                | FilterError::IncompatibleCaching
                | FilterError::Design(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
