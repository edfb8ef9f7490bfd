// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//! Bandpass preprocessing
//!
//! This module builds lazily filtered views over recordings. Two filters are
//! available: a zero-phase spectral filter with smooth erf-shaped band edges,
//! and a Butterworth band-pass applied forward and backward.

pub mod bandpass;
pub mod butter;
pub mod engine;
pub mod kernel;
pub mod parameters;
pub mod window;

pub use bandpass::{BandpassRecord, BandpassRecording};
pub use butter::{design_butter_bandpass, RecursiveCoefficients};
pub use engine::ChunkFilter;
pub use kernel::create_filter_kernel;
pub use parameters::{BandpassParameters, FilterKind};
pub use window::PADDING;

use crate::cache::CachePolicy;
use crate::error::Result;
use crate::recording::Recording;
use log::info;
use std::sync::Arc;

/// Wrap `recording` in a bandpass filtered view, optionally cached
///
/// Nothing is filtered here unless `cache` is [`CachePolicy::WholeRecording`],
/// which filters the whole recording once, `chunk_size` frames at a time.
///
/// ### Errors
///
/// Invalid parameters, an invalid band, or an unstable Butterworth design are
/// reported before any data is read.
pub fn bandpass_filter(
    recording: Arc<dyn Recording>,
    parameters: BandpassParameters,
    cache: CachePolicy,
) -> Result<Arc<dyn Recording>> {
    info!(
        "Bandpass filter {} Hz - {} Hz ({}, cache: {}) on {} channels at {} Hz",
        parameters.freq_min,
        parameters.freq_max,
        parameters.filter_type,
        cache,
        recording.num_channels(),
        recording.sampling_frequency()
    );
    let view: Arc<dyn Recording> = Arc::new(BandpassRecording::new(recording, parameters)?);
    cache.apply(view, parameters.chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::recording::InMemoryRecording;
    use ndarray::Array2;

    fn recording() -> Arc<dyn Recording> {
        let traces = Array2::from_shape_fn((2, 4000), |(c, i)| {
            (2.0 * std::f64::consts::PI * (1000.0 + 500.0 * c as f64) * i as f64 / 30000.0).sin()
        });
        Arc::new(InMemoryRecording::new(traces, 30000.0).unwrap())
    }

    #[test]
    fn test_factory_rejects_bad_configuration_eagerly() {
        let parameters = BandpassParameters::new(300.0, 20000.0).with_filter_type(FilterKind::Recursive);
        assert!(matches!(
            bandpass_filter(recording(), parameters, CachePolicy::None),
            Err(FilterError::InvalidBand { .. })
        ));

        let parameters = BandpassParameters::default().with_chunk_size(0);
        assert!(matches!(
            bandpass_filter(recording(), parameters, CachePolicy::WholeRecording),
            Err(FilterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_high_order_butterworth_is_rejected_eagerly() {
        for order in [18, 20] {
            let parameters = BandpassParameters::default()
                .with_filter_type(FilterKind::Recursive)
                .with_order(order);
            let error = bandpass_filter(recording(), parameters, CachePolicy::WholeRecording)
                .err()
                .unwrap();
            assert!(matches!(error, FilterError::UnstableFilter { .. }), "{:?}", error);
        }
    }

    #[test]
    fn test_cached_views_match_uncached_view() {
        for kind in [FilterKind::Spectral, FilterKind::Recursive] {
            let parameters = BandpassParameters::default()
                .with_filter_type(kind)
                .with_chunk_size(1500);
            let plain = bandpass_filter(recording(), parameters, CachePolicy::None).unwrap();
            let expected = plain.get_traces(1000, 2500, &[1, 0]).unwrap();

            for cache in [CachePolicy::WholeRecording, CachePolicy::PerChunk] {
                let cached = bandpass_filter(recording(), parameters, cache).unwrap();
                let got = cached.get_traces(1000, 2500, &[1, 0]).unwrap();
                assert_eq!(got, expected, "{} with {} cache", kind, cache);
            }
        }
    }
}
