// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//! Lazy bandpass filtering of multichannel recordings
//!
//! A [`Recording`] is anything that serves `channels x frames` traces on
//! demand. [`bandpass_filter`] wraps one in a view that filters each requested
//! chunk when it is read, either with an erf-shaped spectral kernel or with a
//! zero-phase Butterworth filter. The view filters fixed, aligned blocks read
//! with a guard band on both sides, so block boundaries do not show in the
//! output and overlapping reads return the same values.
//!
//! ```no_run
//! use lazy_bandpass::{bandpass_filter, BandpassParameters, CachePolicy, WavRecording};
//! use std::sync::Arc;
//!
//! let recording = Arc::new(WavRecording::open("session.wav").unwrap());
//! let filtered = bandpass_filter(recording, BandpassParameters::default(), CachePolicy::None).unwrap();
//! let chunk = filtered.get_traces(0, 30000, &[0, 1]).unwrap();
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod preprocessing;
pub mod recording;

pub use cache::CachePolicy;
pub use error::{FilterError, Result};
pub use preprocessing::{bandpass_filter, BandpassParameters, BandpassRecording, FilterKind};
pub use recording::{ChannelId, InMemoryRecording, Recording, WavRecording};
