// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Caching decorators for recordings
//!
//! Two strategies are available and they are mutually exclusive:
//!
//! - [`DiskCachedRecording`] materialises the whole wrapped recording into a
//!   temporary file once, then serves every read from a memory map of that file.
//! - [`ChunkCachedRecording`] memoises blocks of `chunk_size` frames in memory,
//!   keyed by block index.
//!
//! Both read the wrapped recording in the same frame-0 aligned blocks that the
//! bandpass view filters, so caching never changes a filtered value.

pub mod chunk;
pub mod disk;

pub use chunk::ChunkCachedRecording;
pub use disk::DiskCachedRecording;

use crate::error::{FilterError, Result};
use crate::recording::Recording;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How a filtered view is cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Every read is filtered on demand
    #[default]
    None,
    /// Filter everything once into a temporary file
    WholeRecording,
    /// Remember each filtered block in memory
    PerChunk,
}

impl CachePolicy {
    /// Translate the `cache_to_file` / `cache_chunks` flag pair
    ///
    /// ### Errors
    ///
    /// [`FilterError::IncompatibleCaching`] when both flags are set.
    pub fn from_flags(cache_to_file: bool, cache_chunks: bool) -> Result<Self> {
        match (cache_to_file, cache_chunks) {
            (true, true) => Err(FilterError::IncompatibleCaching),
            (true, false) => Ok(CachePolicy::WholeRecording),
            (false, true) => Ok(CachePolicy::PerChunk),
            (false, false) => Ok(CachePolicy::None),
        }
    }

    /// Wrap `recording` according to this policy
    ///
    /// `chunk_size` is the block size used to fill either cache.
    pub fn apply(self, recording: Arc<dyn Recording>, chunk_size: usize) -> Result<Arc<dyn Recording>> {
        Ok(match self {
            CachePolicy::None => recording,
            CachePolicy::WholeRecording => Arc::new(DiskCachedRecording::new(recording, chunk_size)?),
            CachePolicy::PerChunk => Arc::new(ChunkCachedRecording::new(recording, chunk_size)),
        })
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::None => write!(f, "none"),
            CachePolicy::WholeRecording => write!(f, "whole recording (disk)"),
            CachePolicy::PerChunk => write!(f, "per chunk (memory)"),
        }
    }
}
