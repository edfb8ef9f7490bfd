// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Frequency-domain bandpass kernel
//!
//! The kernel is a smooth, real-valued gain per DFT bin. The low edge rolls off
//! with `erf(3 (|f| - freq_min) / freq_min)` (about 1e-5 attenuation at DC before
//! the DC bin is zeroed outright), the high edge with
//! `erf((|f| - freq_max) / freq_wid)`. The product is a power response, so the
//! amplitude kernel is its square root.

use libm::erf;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Relative roll-off width of the low edge
const RELATIVE_LOW_WIDTH: f64 = 3.0;

/// Number of distinct chunk lengths kept by [`SpectralKernels`]
const MAX_CACHED_KERNELS: usize = 32;

/// Build the bandpass gain for every bin of an `n`-point DFT
///
/// Bins above `(n + 1) / 2` are negative frequencies. A zero `freq_min`
/// disables the high-pass edge (and the DC kill), a zero `freq_max` disables
/// the low-pass edge.
///
/// # Examples
///
/// ```
/// use lazy_bandpass::preprocessing::kernel::create_filter_kernel;
///
/// let kernel = create_filter_kernel(1000, 30000.0, 300.0, 6000.0, 1000.0);
/// assert_eq!(kernel.len(), 1000);
/// assert_eq!(kernel[0], 0.0);
/// ```
pub fn create_filter_kernel(
    n: usize,
    sampling_frequency: f64,
    freq_min: f64,
    freq_max: f64,
    freq_wid: f64,
) -> Vec<f64> {
    let total_time = n as f64 / sampling_frequency;
    let df = 1.0 / total_time;
    let nyquist_index = (n as f64 + 1.0) / 2.0;

    (0..n)
        .map(|i| {
            let k = if i as f64 <= nyquist_index {
                i as f64
            } else {
                i as f64 - n as f64
            };
            let abs_f = (df * k).abs();

            let mut gain = 1.0;
            if freq_min != 0.0 {
                gain *= (1.0 + erf(RELATIVE_LOW_WIDTH * (abs_f - freq_min) / freq_min)) / 2.0;
                if k.abs() < 0.1 {
                    gain = 0.0;
                }
            }
            if freq_max != 0.0 {
                gain *= (1.0 - erf((abs_f - freq_max) / freq_wid)) / 2.0;
            }
            gain.sqrt()
        })
        .collect()
}

/// One-sided kernels for a fixed set of cutoffs, memoised by chunk length
///
/// Only the first `n / 2 + 1` bins are kept: the spectrum of real data.
#[derive(Debug)]
pub struct SpectralKernels {
    sampling_frequency: f64,
    freq_min: f64,
    freq_max: f64,
    freq_wid: f64,
    cache: RwLock<HashMap<usize, Arc<[f64]>>>,
}

impl SpectralKernels {
    pub fn new(sampling_frequency: f64, freq_min: f64, freq_max: f64, freq_wid: f64) -> Self {
        Self {
            sampling_frequency,
            freq_min,
            freq_max,
            freq_wid,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Kernel for an `n`-sample chunk, truncated to the real-input spectrum length
    pub fn one_sided(&self, n: usize) -> Arc<[f64]> {
        if let Some(kernel) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&n)
        {
            return Arc::clone(kernel);
        }

        let mut kernel = create_filter_kernel(
            n,
            self.sampling_frequency,
            self.freq_min,
            self.freq_max,
            self.freq_wid,
        );
        kernel.truncate(n / 2 + 1);
        let kernel: Arc<[f64]> = kernel.into();

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= MAX_CACHED_KERNELS {
            cache.clear();
        }
        cache.insert(n, Arc::clone(&kernel));
        kernel
    }

    pub fn cached_lengths(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bin_of(freq: f64, n: usize, fs: f64) -> usize {
        (freq * n as f64 / fs).round() as usize
    }

    #[test]
    fn test_dc_bin_is_zero_whenever_high_pass_is_active() {
        for &(freq_min, freq_max) in &[(300.0, 6000.0), (0.5, 10.0), (1e4, 0.0), (1e-3, 1e5)] {
            for &n in &[16usize, 1001, 16000] {
                let kernel = create_filter_kernel(n, 30000.0, freq_min, freq_max, 1000.0);
                assert_eq!(kernel[0], 0.0, "freq_min={} n={}", freq_min, n);
            }
        }
    }

    #[test]
    fn test_all_pass_when_both_cutoffs_are_zero() {
        let kernel = create_filter_kernel(513, 30000.0, 0.0, 0.0, 1000.0);
        assert!(kernel.iter().all(|&g| g == 1.0));
    }

    #[test]
    fn test_bandpass_shape() {
        let n = 16000;
        let fs = 30000.0;
        let kernel = create_filter_kernel(n, fs, 300.0, 6000.0, 1000.0);

        assert_abs_diff_eq!(kernel[bin_of(1000.0, n, fs)], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kernel[bin_of(3000.0, n, fs)], 1.0, epsilon = 1e-6);
        // Half power at the low edge
        assert_abs_diff_eq!(kernel[bin_of(300.0, n, fs)], 0.5f64.sqrt(), epsilon = 1e-6);
        assert!(kernel[bin_of(10.0, n, fs)] < 1e-2);
        assert!(kernel[bin_of(10000.0, n, fs)] < 1e-3);
        assert!(kernel.iter().all(|&g| (0.0..=1.0).contains(&g)));
    }

    #[test]
    fn test_negative_frequencies_mirror_positive_ones() {
        let n = 1000;
        let kernel = create_filter_kernel(n, 30000.0, 300.0, 6000.0, 1000.0);
        for k in 1..n / 2 {
            assert_abs_diff_eq!(kernel[k], kernel[n - k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_one_sided_kernels_are_truncated_and_memoised() {
        let kernels = SpectralKernels::new(30000.0, 300.0, 6000.0, 1000.0);
        let even = kernels.one_sided(1000);
        let odd = kernels.one_sided(1001);
        assert_eq!(even.len(), 501);
        assert_eq!(odd.len(), 501);
        assert_eq!(kernels.cached_lengths(), 2);

        let again = kernels.one_sided(1000);
        assert!(Arc::ptr_eq(&even, &again));
        let full = create_filter_kernel(1000, 30000.0, 300.0, 6000.0, 1000.0);
        assert_eq!(&even[..], &full[..501]);
    }
}
