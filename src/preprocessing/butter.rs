// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Butterworth band-pass design and zero-phase application
//!
//! The filter is designed once with `sci-rs` in zeros/poles/gain form. From it
//! we keep:
//!
//! 1. the transfer function (`b`, `a`), which is the record of the design and
//!    must have every root of `a` strictly inside the unit circle
//! 2. second-order sections, which `sosfiltfilt_dyn` applies forward and
//!    backward (SciPy `sosfiltfilt` semantics)
//!
//! # Examples
//!
//! ```
//! use lazy_bandpass::preprocessing::butter::design_butter_bandpass;
//!
//! let coefficients = design_butter_bandpass(3, 300.0, 6000.0, 30000.0).unwrap();
//! assert_eq!(coefficients.denominator().len(), 7);
//! assert_eq!(coefficients.sections().len(), 3);
//!
//! let signal = vec![0.0; 1000];
//! assert_eq!(coefficients.filtfilt(&signal).unwrap().len(), 1000);
//! ```

use crate::error::{FilterError, Result};
use log::debug;
use nalgebra::DMatrix;
use num_complex::Complex64;
use sci_rs::signal::filter::design::{
    iirfilter_dyn, zpk2sos_dyn, zpk2tf_dyn, DigitalFilter, FilterBandType, FilterOutputType,
    FilterType, Sos, ZpkFormatFilter,
};
use sci_rs::signal::filter::sosfiltfilt_dyn;

/// Iteration cap for the Schur decomposition of the companion matrix
const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Coefficients of a stable Butterworth band-pass filter
///
/// `(b, a)` are normalised so that `a[0] == 1`.
#[derive(Debug, Clone)]
pub struct RecursiveCoefficients {
    b: Vec<f64>,
    a: Vec<f64>,
    poles: Vec<Complex64>,
    sections: Vec<Sos<f64>>,
}

impl RecursiveCoefficients {
    /// Derive the transfer function and the sections from a digital `zpk` design
    fn from_zpk(order: usize, zpk: ZpkFormatFilter<f64>) -> Result<Self> {
        let design_radius = max_pole_radius(&zpk.p);

        let ba = zpk2tf_dyn(2 * order, &zpk.z, &zpk.p, zpk.k);
        let a0 = match ba.a.first() {
            Some(&a0) if a0 != 0.0 && a0.is_finite() => a0,
            _ => {
                return Err(FilterError::Design(
                    "denominator must start with a finite, non-zero coefficient".to_string(),
                ))
            }
        };
        let b: Vec<f64> = ba.b.iter().map(|c| c / a0).collect();
        let a: Vec<f64> = ba.a.iter().map(|c| c / a0).collect();

        let poles = polynomial_roots(&a)?;
        let max_pole_radius = design_radius.max(max_pole_radius(&poles));
        debug!(
            "Butterworth order {}: largest pole magnitude {:.6}",
            order, max_pole_radius
        );
        if !(max_pole_radius < 1.0) || b.iter().any(|c| !c.is_finite()) {
            return Err(FilterError::UnstableFilter { max_pole_radius });
        }

        let sections = zpk2sos_dyn(order, zpk, None, Some(false)).sos;
        Ok(Self {
            b,
            a,
            poles,
            sections,
        })
    }

    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64] {
        &self.a
    }

    /// Roots of the denominator polynomial
    pub fn poles(&self) -> &[Complex64] {
        &self.poles
    }

    /// Second-order sections used for filtering
    pub fn sections(&self) -> &[Sos<f64>] {
        &self.sections
    }

    /// Shortest signal [`filtfilt`](Self::filtfilt) accepts
    ///
    /// The signal is extended by `3 * ntaps` samples at each end, and the
    /// extension must be shorter than the signal.
    pub fn min_signal_len(&self) -> usize {
        let b_zeros = self.sections.iter().filter(|s| s.b[2] == 0.0).count();
        let a_zeros = self.sections.iter().filter(|s| s.a[2] == 0.0).count();
        let ntaps = 2 * self.sections.len() + 1 - b_zeros.min(a_zeros);
        3 * ntaps + 1
    }

    /// Zero-phase filtering: forward pass, then backward pass over the reversed output
    ///
    /// ### Errors
    ///
    /// [`FilterError::Shape`] when the signal is not empty but shorter than
    /// [`min_signal_len`](Self::min_signal_len).
    pub fn filtfilt(&self, signal: &[f64]) -> Result<Vec<f64>> {
        if signal.is_empty() {
            return Ok(Vec::new());
        }
        let min_len = self.min_signal_len();
        if signal.len() < min_len {
            return Err(FilterError::Shape(format!(
                "recursive filtering needs at least {} samples, got {}",
                min_len,
                signal.len()
            )));
        }
        Ok(sosfiltfilt_dyn(signal.iter(), &self.sections))
    }
}

/// Design a Butterworth band-pass filter
///
/// ### Arguments
///
/// * `order` - Filter order (the transfer function has degree `2 * order`)
/// * `freq_min` / `freq_max` - Band edges in Hz
/// * `sampling_frequency` - Sampling frequency in Hz
///
/// ### Errors
///
/// * [`FilterError::InvalidParameter`] for a zero order
/// * [`FilterError::InvalidBand`] unless `0 < freq_min < freq_max < fs / 2`
/// * [`FilterError::UnstableFilter`] if a root of `a` is not strictly inside
///   the unit circle, or cannot be computed as a finite number
pub fn design_butter_bandpass(
    order: usize,
    freq_min: f64,
    freq_max: f64,
    sampling_frequency: f64,
) -> Result<RecursiveCoefficients> {
    if order == 0 {
        return Err(FilterError::InvalidParameter(
            "filter order must be greater than 0".to_string(),
        ));
    }

    let nyquist = sampling_frequency / 2.0;
    let low = freq_min / nyquist;
    let high = freq_max / nyquist;
    if !(low > 0.0 && low < high && high < 1.0) {
        return Err(FilterError::InvalidBand {
            freq_min,
            freq_max,
            sampling_frequency,
        });
    }

    let filter = iirfilter_dyn(
        order,
        vec![low, high],                // critical frequencies (normalized)
        None,                           // rp (not used for Butterworth)
        None,                           // rs (not used for Butterworth)
        Some(FilterBandType::Bandpass), // filter type
        Some(FilterType::Butterworth),  // analog prototype
        Some(false),                    // digital filter
        Some(FilterOutputType::Zpk),    // zeros, poles and gain
        None,                           // fs (already normalized)
    );

    match filter {
        DigitalFilter::Zpk(zpk) => RecursiveCoefficients::from_zpk(order, zpk),
        _ => Err(FilterError::Design(
            "expected zeros/poles/gain output from the IIR designer".to_string(),
        )),
    }
}

/// Largest root magnitude, infinite if any root is not finite
fn max_pole_radius(poles: &[Complex64]) -> f64 {
    poles
        .iter()
        .map(|p| {
            if p.re.is_finite() && p.im.is_finite() {
                p.norm()
            } else {
                f64::INFINITY
            }
        })
        .fold(0.0, f64::max)
}

/// Roots of a polynomial given highest degree first
///
/// The roots are the eigenvalues of the companion matrix.
pub fn polynomial_roots(coefficients: &[f64]) -> Result<Vec<Complex64>> {
    // Leading zeros do not contribute roots
    let start = coefficients
        .iter()
        .position(|&c| c != 0.0)
        .unwrap_or(coefficients.len());
    let coefficients = &coefficients[start..];
    if coefficients.len() < 2 {
        return Ok(Vec::new());
    }
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Ok(vec![Complex64::new(f64::NAN, f64::NAN); coefficients.len() - 1]);
    }

    let degree = coefficients.len() - 1;
    let lead = coefficients[0];
    let companion = DMatrix::from_fn(degree, degree, |row, col| {
        if row == 0 {
            -coefficients[col + 1] / lead
        } else if row == col + 1 {
            1.0
        } else {
            0.0
        }
    });

    let schur = companion
        .try_schur(f64::EPSILON, MAX_SCHUR_ITERATIONS)
        .ok_or_else(|| {
            FilterError::Design(format!(
                "no convergence locating the roots of a degree {} polynomial",
                degree
            ))
        })?;
    Ok(schur.complex_eigenvalues().iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_polynomial_roots() {
        // (z - 0.5)(z + 0.25)(z - 2) = z^3 - 2.25 z^2 + 0.375 z + 0.25
        let mut roots: Vec<f64> = polynomial_roots(&[1.0, -2.25, 0.375, 0.25])
            .unwrap()
            .iter()
            .map(|r| {
                assert_abs_diff_eq!(r.im, 0.0, epsilon = 1e-9);
                r.re
            })
            .collect();
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(roots[0], -0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_complex_roots() {
        // z^2 + 0.81 has roots +-0.9i
        let roots = polynomial_roots(&[1.0, 0.0, 0.81]).unwrap();
        assert_eq!(roots.len(), 2);
        for root in roots {
            assert_abs_diff_eq!(root.norm(), 0.9, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_pole_radius_of_unstable_denominators() {
        // Roots at 2.0 and 0.5
        let roots = polynomial_roots(&[1.0, -2.5, 1.0]).unwrap();
        assert_abs_diff_eq!(max_pole_radius(&roots), 2.0, epsilon = 1e-9);

        // Pole exactly on the unit circle
        let roots = polynomial_roots(&[1.0, -1.0]).unwrap();
        assert_abs_diff_eq!(max_pole_radius(&roots), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_poles_count_as_unstable() {
        let nan = Complex64::new(f64::NAN, 0.0);
        assert_eq!(
            max_pole_radius(&[Complex64::new(0.5, 0.0), nan]),
            f64::INFINITY
        );
        assert_eq!(max_pole_radius(&[nan, Complex64::new(0.5, 0.0)]), f64::INFINITY);

        let roots = polynomial_roots(&[1.0, f64::NAN, 0.25]).unwrap();
        assert_eq!(max_pole_radius(&roots), f64::INFINITY);
    }

    #[test]
    fn test_design_is_stable_with_expected_degree() {
        for order in 1..=5 {
            let coefficients = design_butter_bandpass(order, 300.0, 6000.0, 30000.0).unwrap();
            assert_eq!(coefficients.denominator().len(), 2 * order + 1);
            assert_eq!(coefficients.numerator().len(), 2 * order + 1);
            assert_eq!(coefficients.poles().len(), 2 * order);
            assert_eq!(coefficients.sections().len(), order);
            assert_abs_diff_eq!(coefficients.denominator()[0], 1.0);
            assert!(coefficients.poles().iter().all(|p| p.norm() < 1.0));
        }
    }

    #[test]
    fn test_high_orders_are_rejected_not_filtered() {
        // The transfer-function form of these designs has roots well outside the unit circle
        for order in [18, 20] {
            match design_butter_bandpass(order, 300.0, 6000.0, 30000.0) {
                Err(FilterError::UnstableFilter { max_pole_radius }) => {
                    assert!(max_pole_radius >= 1.0, "radius {}", max_pole_radius)
                }
                other => panic!("order {}: expected an unstable filter, got {:?}", order, other),
            }
        }
    }

    #[test]
    fn test_narrow_band_is_rejected() {
        let error = design_butter_bandpass(10, 300.0, 310.0, 30000.0).unwrap_err();
        assert!(matches!(error, FilterError::UnstableFilter { .. }));
        assert!(error.is_configuration_error());
    }

    #[test]
    fn test_design_rejects_invalid_bands() {
        assert!(matches!(
            design_butter_bandpass(3, 300.0, 20000.0, 30000.0),
            Err(FilterError::InvalidBand { .. })
        ));
        assert!(matches!(
            design_butter_bandpass(3, 6000.0, 300.0, 30000.0),
            Err(FilterError::InvalidBand { .. })
        ));
        assert!(matches!(
            design_butter_bandpass(3, 0.0, 300.0, 30000.0),
            Err(FilterError::InvalidBand { .. })
        ));
        assert!(matches!(
            design_butter_bandpass(0, 300.0, 6000.0, 30000.0),
            Err(FilterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_filtfilt_passes_band_and_rejects_dc() {
        let fs = 30000.0;
        let coefficients = design_butter_bandpass(3, 300.0, 6000.0, fs).unwrap();

        let tone = sine(1500.0, fs, 6000);
        let filtered = coefficients.filtfilt(&tone).unwrap();
        assert_eq!(filtered.len(), tone.len());
        for i in 1000..5000 {
            assert_abs_diff_eq!(filtered[i], tone[i], epsilon = 0.02);
        }

        let offset = vec![1.0; 6000];
        let filtered = coefficients.filtfilt(&offset).unwrap();
        assert!(filtered[1000..5000].iter().all(|y| y.abs() < 1e-3));
    }

    #[test]
    fn test_filtfilt_short_signals() {
        let coefficients = design_butter_bandpass(2, 300.0, 6000.0, 30000.0).unwrap();
        // Two sections: 5 taps, 15 samples of extension at each end
        assert_eq!(coefficients.min_signal_len(), 16);
        assert!(coefficients.filtfilt(&[]).unwrap().is_empty());
        assert!(matches!(
            coefficients.filtfilt(&[1.0, 2.0, 3.0]),
            Err(FilterError::Shape(_))
        ));
        assert!(coefficients.filtfilt(&[0.5; 15]).is_err());
        assert_eq!(coefficients.filtfilt(&[0.5; 16]).unwrap().len(), 16);
    }
}
