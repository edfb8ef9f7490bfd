// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Chunk filtering
//!
//! [`ChunkFilter`] turns a `channels x samples` chunk into a filtered chunk of the
//! same shape. Channels are independent and are processed in parallel.

use super::butter::{design_butter_bandpass, RecursiveCoefficients};
use super::kernel::SpectralKernels;
use super::parameters::{BandpassParameters, FilterKind};
use crate::error::{FilterError, Result};
use log::debug;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::{Arc, Mutex, PoisonError};

enum FilterMode {
    Spectral {
        kernels: SpectralKernels,
        planner: Mutex<RealFftPlanner<f64>>,
    },
    Recursive(RecursiveCoefficients),
}

/// Filters chunks with fixed parameters
pub struct ChunkFilter {
    parameters: BandpassParameters,
    sampling_frequency: f64,
    mode: FilterMode,
}

impl ChunkFilter {
    /// Prepare a filter for recordings sampled at `sampling_frequency`
    ///
    /// The Butterworth coefficients are designed here, so an unstable or invalid
    /// recursive configuration fails before any chunk is filtered.
    pub fn new(parameters: BandpassParameters, sampling_frequency: f64) -> Result<Self> {
        parameters.validate()?;

        let mode = match parameters.filter_type {
            FilterKind::Spectral => FilterMode::Spectral {
                kernels: SpectralKernels::new(
                    sampling_frequency,
                    parameters.freq_min,
                    parameters.freq_max,
                    parameters.freq_wid,
                ),
                planner: Mutex::new(RealFftPlanner::new()),
            },
            FilterKind::Recursive => FilterMode::Recursive(design_butter_bandpass(
                parameters.order,
                parameters.freq_min,
                parameters.freq_max,
                sampling_frequency,
            )?),
        };

        Ok(Self {
            parameters,
            sampling_frequency,
            mode,
        })
    }

    pub fn parameters(&self) -> &BandpassParameters {
        &self.parameters
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    /// Butterworth coefficients, for the recursive filter only
    pub fn coefficients(&self) -> Option<&RecursiveCoefficients> {
        match &self.mode {
            FilterMode::Recursive(coefficients) => Some(coefficients),
            FilterMode::Spectral { .. } => None,
        }
    }

    /// Filter every row of `chunk` along the sample axis
    pub fn filter(&self, chunk: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (channels, samples) = chunk.dim();
        if channels == 0 || samples == 0 {
            return Ok(chunk.to_owned());
        }
        debug!(
            "Filtering {} channels x {} samples ({})",
            channels, samples, self.parameters.filter_type
        );

        let rows: Vec<Vec<f64>> = chunk.outer_iter().map(|row| row.to_vec()).collect();
        let filtered: Vec<Vec<f64>> = match &self.mode {
            FilterMode::Spectral { kernels, planner } => {
                let kernel = kernels.one_sided(samples);
                let (forward, inverse) = {
                    let mut planner = planner.lock().unwrap_or_else(PoisonError::into_inner);
                    (
                        planner.plan_fft_forward(samples),
                        planner.plan_fft_inverse(samples),
                    )
                };
                rows.into_par_iter()
                    .map(|row| filter_spectral(row, &kernel, &forward, &inverse))
                    .collect::<Result<_>>()?
            }
            FilterMode::Recursive(coefficients) => rows
                .par_iter()
                .map(|row| coefficients.filtfilt(row))
                .collect::<Result<_>>()?,
        };

        if filtered.iter().any(|row| row.len() != samples) {
            return Err(FilterError::Shape(format!(
                "filtered rows do not have {} samples",
                samples
            )));
        }
        let flat: Vec<f64> = filtered.into_iter().flatten().collect();
        Array2::from_shape_vec((channels, samples), flat)
            .map_err(|e| FilterError::Shape(e.to_string()))
    }
}

/// Multiply the real spectrum of `row` by `kernel` and transform back
fn filter_spectral(
    mut row: Vec<f64>,
    kernel: &[f64],
    forward: &Arc<dyn RealToComplex<f64>>,
    inverse: &Arc<dyn ComplexToReal<f64>>,
) -> Result<Vec<f64>> {
    let n = row.len();
    let mut spectrum = forward.make_output_vec();
    forward
        .process(&mut row, &mut spectrum)
        .map_err(|e| FilterError::Fft(e.to_string()))?;

    for (bin, &gain) in spectrum.iter_mut().zip(kernel) {
        *bin *= gain;
    }
    // The inverse transform requires purely real DC and Nyquist bins
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        if let Some(nyquist) = spectrum.last_mut() {
            nyquist.im = 0.0;
        }
    }

    let mut output = inverse.make_output_vec();
    inverse
        .process(&mut spectrum, &mut output)
        .map_err(|e| FilterError::Fft(e.to_string()))?;

    let scale = 1.0 / n as f64;
    output.iter_mut().for_each(|sample| *sample *= scale);
    Ok(output)
}
