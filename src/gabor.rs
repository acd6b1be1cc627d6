//! Gabor filter bank construction.
//!
//! A bank is the cartesian product of three parameter sweeps: envelope
//! width (scale), carrier wavelength (frequency), and orientation. Each
//! combination yields one complex kernel, a sinusoidal carrier under a
//! Gaussian envelope:
//!
//! ```text
//! g(x, y) = exp(-(x'^2 + gamma^2 y'^2) / (2 sigma^2)) * exp(i 2 pi x' / lambda)
//! x' =  x cos(theta) + y sin(theta)
//! y' = -x sin(theta) + y cos(theta)
//! ```
//!
//! Kernels are stored width-major, then wavelength, then orientation. The
//! same order must be used when a classifier is trained and when it is
//! evaluated, so the bank is fully determined by the three counts.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest and largest (exclusive) Gaussian envelope sigma, in pixels.
const SIGMA_MIN: f64 = 2.0;
const SIGMA_MAX: f64 = 6.0;

/// Smallest and largest (exclusive) carrier wavelength, in pixels.
const LAMBDA_MIN: f64 = 4.0;
const LAMBDA_MAX: f64 = 16.0;

/// Spatial aspect ratio of the envelope.
const GAMMA: f64 = 0.5;

/// Kernel half-size in units of sigma.
const SUPPORT_SIGMAS: f64 = 3.0;

/// The three counts that define a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankShape {
    pub nwidths: usize,
    pub nlambdas: usize,
    pub nthetas: usize,
}

impl BankShape {
    pub const fn new(nwidths: usize, nlambdas: usize, nthetas: usize) -> Self {
        Self {
            nwidths,
            nlambdas,
            nthetas,
        }
    }

    pub fn num_kernels(&self) -> usize {
        self.nwidths * self.nlambdas * self.nthetas
    }

    fn validate(&self) -> Result<()> {
        if self.nwidths == 0 || self.nlambdas == 0 || self.nthetas == 0 {
            return Err(Error::Config(format!(
                "filter bank needs at least one width, wavelength and orientation, got {}x{}x{}",
                self.nwidths, self.nlambdas, self.nthetas
            )));
        }
        Ok(())
    }
}

/// Where a kernel sits in the parameter sweep, and the physical values
/// derived from that position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub width_idx: usize,
    pub lambda_idx: usize,
    pub theta_idx: usize,
    pub sigma: f64,
    pub lambda: f64,
    pub theta: f64,
}

/// A square complex Gabor kernel with odd side length.
#[derive(Debug, Clone)]
pub struct Kernel {
    params: KernelParams,
    half: usize,
    real: Vec<f32>,
    imag: Vec<f32>,
}

impl Kernel {
    fn generate(params: KernelParams) -> Self {
        let half = (SUPPORT_SIGMAS * params.sigma).ceil() as usize;
        let side = 2 * half + 1;
        let (sin_t, cos_t) = params.theta.sin_cos();
        let two_sigma_sq = 2.0 * params.sigma * params.sigma;

        let mut envelope = Vec::with_capacity(side * side);
        let mut real = Vec::with_capacity(side * side);
        let mut imag = Vec::with_capacity(side * side);

        for ky in 0..side {
            let y = ky as f64 - half as f64;
            for kx in 0..side {
                let x = kx as f64 - half as f64;
                let xr = x * cos_t + y * sin_t;
                let yr = -x * sin_t + y * cos_t;
                let env = (-(xr * xr + GAMMA * GAMMA * yr * yr) / two_sigma_sq).exp();
                let phase = 2.0 * PI * xr / params.lambda;
                envelope.push(env);
                real.push(env * phase.cos());
                imag.push(env * phase.sin());
            }
        }

        // Remove the DC response of the even part so flat regions score zero,
        // then scale both parts to unit envelope mass.
        let env_sum: f64 = envelope.iter().sum();
        let dc = real.iter().sum::<f64>() / env_sum;
        let real = real
            .iter()
            .zip(&envelope)
            .map(|(r, e)| ((r - dc * e) / env_sum) as f32)
            .collect();
        let imag = imag.iter().map(|i| (i / env_sum) as f32).collect();

        Self {
            params,
            half,
            real,
            imag,
        }
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Distance from the center tap to the border.
    pub fn half_size(&self) -> usize {
        self.half
    }

    /// Side length of the square support.
    pub fn size(&self) -> usize {
        2 * self.half + 1
    }

    /// Even (cosine) taps, row-major.
    pub fn real(&self) -> &[f32] {
        &self.real
    }

    /// Odd (sine) taps, row-major.
    pub fn imag(&self) -> &[f32] {
        &self.imag
    }
}

/// An ordered, read-only collection of Gabor kernels.
#[derive(Debug, Clone)]
pub struct FilterBank {
    shape: BankShape,
    kernels: Vec<Kernel>,
}

impl FilterBank {
    /// Build the bank for the given sweep counts.
    ///
    /// Fails with a configuration error if any count is zero, since an
    /// empty bank produces empty feature vectors.
    pub fn build(nwidths: usize, nlambdas: usize, nthetas: usize) -> Result<Self> {
        Self::from_shape(BankShape::new(nwidths, nlambdas, nthetas))
    }

    pub fn from_shape(shape: BankShape) -> Result<Self> {
        shape.validate()?;

        let sigma_step = (SIGMA_MAX - SIGMA_MIN) / shape.nwidths as f64;
        let lambda_step = (LAMBDA_MAX - LAMBDA_MIN) / shape.nlambdas as f64;
        let theta_step = PI / shape.nthetas as f64;

        let mut kernels = Vec::with_capacity(shape.num_kernels());
        for width_idx in 0..shape.nwidths {
            for lambda_idx in 0..shape.nlambdas {
                for theta_idx in 0..shape.nthetas {
                    kernels.push(Kernel::generate(KernelParams {
                        width_idx,
                        lambda_idx,
                        theta_idx,
                        sigma: SIGMA_MIN + width_idx as f64 * sigma_step,
                        lambda: LAMBDA_MIN + lambda_idx as f64 * lambda_step,
                        theta: theta_idx as f64 * theta_step,
                    }));
                }
            }
        }

        log::debug!(
            "built Gabor bank {}x{}x{} ({} kernels)",
            shape.nwidths,
            shape.nlambdas,
            shape.nthetas,
            kernels.len()
        );

        Ok(Self { shape, kernels })
    }

    pub fn shape(&self) -> BankShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Kernel> {
        self.kernels.iter()
    }
}

impl<'a> IntoIterator for &'a FilterBank {
    type Item = &'a Kernel;
    type IntoIter = std::slice::Iter<'a, Kernel>;

    fn into_iter(self) -> Self::IntoIter {
        self.kernels.iter()
    }
}
