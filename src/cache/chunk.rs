// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory memoisation of aligned blocks

use crate::error::Result;
use crate::recording::{
    channel_indices, read_aligned_blocks, ChannelId, Recording, RecordingDescriptor,
};
use log::trace;
use ndarray::{Array2, Axis};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Remembers every block of `chunk_size` frames read from the wrapped recording
///
/// Blocks are aligned on frame 0 and keyed by their index; each holds all
/// channels. Entries are never evicted. Two threads missing on the same block
/// may both compute it; the second result simply replaces the first.
pub struct ChunkCachedRecording {
    recording: Arc<dyn Recording>,
    chunk_size: usize,
    chunks: Mutex<HashMap<usize, Arc<Array2<f64>>>>,
}

impl ChunkCachedRecording {
    pub fn new(recording: Arc<dyn Recording>, chunk_size: usize) -> Self {
        Self {
            recording,
            chunk_size: chunk_size.max(1),
            chunks: Mutex::new(HashMap::new()),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of cached blocks
    pub fn len(&self) -> usize {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All channels of block `index`, from the cache or the wrapped recording
    fn block(&self, index: usize, block_start: usize, block_end: usize) -> Result<Arc<Array2<f64>>> {
        let hit = self
            .chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
            .cloned();
        if let Some(block) = hit {
            trace!("Chunk cache hit for block {}", index);
            return Ok(block);
        }

        let block = Arc::new(self.recording.get_traces(
            block_start,
            block_end,
            self.recording.channel_ids(),
        )?);
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, Arc::clone(&block));
        Ok(block)
    }
}

impl Recording for ChunkCachedRecording {
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
        self.validate_range(start, end)?;
        let rows = channel_indices(self.channel_ids(), channel_ids)?;
        read_aligned_blocks(
            rows.len(),
            start,
            end,
            self.num_frames(),
            self.chunk_size,
            |index, block_start, block_end| {
                Ok(self
                    .block(index, block_start, block_end)?
                    .select(Axis(0), &rows))
            },
        )
    }

    fn describe(&self) -> RecordingDescriptor {
        RecordingDescriptor::decorator(
            "chunk_cache",
            self.recording.as_ref(),
            serde_json::json!({ "chunk_size": self.chunk_size }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::recording::InMemoryRecording;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads reaching the wrapped recording
    struct Counting {
        inner: InMemoryRecording,
        reads: AtomicUsize,
    }

    impl Recording for Counting {
        fn sampling_frequency(&self) -> f64 {
            self.inner.sampling_frequency()
        }
        fn num_frames(&self) -> usize {
            self.inner.num_frames()
        }
        fn channel_ids(&self) -> &[ChannelId] {
            self.inner.channel_ids()
        }
        fn get_traces(&self, start: usize, end: usize, ids: &[ChannelId]) -> Result<Array2<f64>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_traces(start, end, ids)
        }
        fn describe(&self) -> RecordingDescriptor {
            self.inner.describe()
        }
    }

    fn counting() -> Arc<Counting> {
        let traces = Array2::from_shape_fn((2, 64), |(c, i)| (c + i) as f64);
        Arc::new(Counting {
            inner: InMemoryRecording::new(traces, 100.0).unwrap(),
            reads: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_repeated_reads_hit_the_cache() {
        let source = counting();
        let cached = ChunkCachedRecording::new(source.clone(), 16);
        assert!(cached.is_empty());

        // [8, 24) spans blocks 0 and 1
        let first = cached.get_traces(8, 24, &[1, 0]).unwrap();
        let second = cached.get_traces(8, 24, &[1, 0]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, source.inner.get_traces(8, 24, &[1, 0]).unwrap());
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
        assert_eq!(cached.len(), 2);

        // Other channels and overlapping ranges reuse the same blocks
        let other = cached.get_traces(0, 20, &[0]).unwrap();
        assert_eq!(other, source.inner.get_traces(0, 20, &[0]).unwrap());
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);

        // The last block is short
        let tail = cached.get_traces(60, 64, &[1]).unwrap();
        assert_eq!(tail, source.inner.get_traces(60, 64, &[1]).unwrap());
        assert_eq!(cached.len(), 3);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let source = counting();
        let cached = ChunkCachedRecording::new(source.clone(), 16);
        assert!(matches!(
            cached.get_traces(0, 65, &[0]),
            Err(FilterError::OutOfBounds { .. })
        ));
        assert!(matches!(
            cached.get_traces(0, 4, &[5]),
            Err(FilterError::UnknownChannel(5))
        ));
        assert!(cached.is_empty());
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);

        let descriptor = cached.describe();
        assert_eq!(descriptor.kind, "chunk_cache");
        assert_eq!(descriptor.parameters["chunk_size"], 16);
    }
}
