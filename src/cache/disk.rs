// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Whole-recording cache in a temporary file
//!
//! Samples are stored frame-major as little-endian `f64`, so a frame range of
//! all channels is one contiguous slice of the memory map.

use crate::error::Result;
use crate::recording::{channel_indices, chunk_ranges, ChannelId, Recording, RecordingDescriptor};
use log::{debug, info};
use memmap2::Mmap;
use ndarray::Array2;
use std::io::{BufWriter, Write};
use std::sync::Arc;

const SAMPLE_BYTES: usize = std::mem::size_of::<f64>();

/// Recording served from a temporary file holding every sample of another recording
pub struct DiskCachedRecording {
    source: RecordingDescriptor,
    sampling_frequency: f64,
    num_frames: usize,
    channel_ids: Vec<ChannelId>,
    /// `None` when there is no sample to map
    samples: Option<Mmap>,
}

impl DiskCachedRecording {
    /// Read all of `recording` in blocks of `chunk_size` frames and write it to a temporary file
    ///
    /// The blocks are aligned on frame 0, like the blocks a bandpass view
    /// filters. The file is unlinked on creation and disappears with the map.
    pub fn new(recording: Arc<dyn Recording>, chunk_size: usize) -> Result<Self> {
        let channel_ids = recording.channel_ids().to_vec();
        let num_frames = recording.num_frames();
        info!(
            "Caching {} frames x {} channels to a temporary file",
            num_frames,
            channel_ids.len()
        );

        let mut writer = BufWriter::new(tempfile::tempfile()?);
        for (start, end) in chunk_ranges(num_frames, chunk_size) {
            debug!("Materialising frames [{}, {})", start, end);
            let block = recording.get_traces(start, end, &channel_ids)?;
            for frame in block.columns() {
                for &sample in frame {
                    writer.write_all(&sample.to_le_bytes())?;
                }
            }
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;

        // The file is private to this cache and never written again
        let samples = if num_frames * channel_ids.len() == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            source: recording.describe(),
            sampling_frequency: recording.sampling_frequency(),
            num_frames,
            channel_ids,
            samples,
        })
    }
}

impl Recording for DiskCachedRecording {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn num_frames(&self) -> usize {
        self.num_frames
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
        let channels = self.channel_ids.len();
        let frames = end - start;

        let offset = start * channels * SAMPLE_BYTES;
        let bytes = match &self.samples {
            Some(samples) => &samples[offset..offset + frames * channels * SAMPLE_BYTES],
            None => &[][..],
        };

        let decode = |frame: usize, channel: usize| {
            let at = (frame * channels + channel) * SAMPLE_BYTES;
            let mut sample = [0u8; SAMPLE_BYTES];
            sample.copy_from_slice(&bytes[at..at + SAMPLE_BYTES]);
            f64::from_le_bytes(sample)
        };
        Ok(Array2::from_shape_fn((rows.len(), frames), |(r, i)| {
            decode(i, rows[r])
        }))
    }

    fn describe(&self) -> RecordingDescriptor {
        RecordingDescriptor {
            kind: "disk_cache".to_string(),
            sampling_frequency: self.sampling_frequency,
            num_frames: self.num_frames,
            channel_ids: self.channel_ids.clone(),
            path: None,
            parent: Some(Box::new(self.source.clone())),
            parameters: serde_json::Value::Null,
        }
    }
}
