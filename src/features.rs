use ::image::{ColorType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gabor::{FilterBank, Kernel};

/// Trait for accessing pixel intensities from a single-channel image.
pub trait ImageAccess {
    /// Get the grayscale intensity at (x, y). Returns 0 for out-of-bounds pixels.
    fn get_pixel(&self, x: i32, y: i32) -> u8;

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// A simple 8-bit grayscale image buffer implementing ImageAccess.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    /// Wrap a row-major intensity buffer.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "image has zero dimension ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "buffer holds {} bytes, {}x{} single-channel image needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { data, width, height }
    }

    /// Take a decoded image that is already single-channel intensity data.
    ///
    /// Color images are rejected rather than converted: deciding how to
    /// collapse channels belongs to the caller's preprocessing.
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        match img.color() {
            ColorType::L8 | ColorType::L16 => {
                let luma = img.to_luma8();
                let (width, height) = luma.dimensions();
                Self::new(luma.into_raw(), width, height)
            }
            other => Err(Error::InvalidInput(format!(
                "expected single-channel intensity image, got {:?}",
                other
            ))),
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }
}

impl From<::image::GrayImage> for GrayImage {
    fn from(img: ::image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
        }
    }
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// One magnitude per bank kernel, in bank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}

/// Intensities scaled to [0, 1], padded on every side by replicating the
/// border pixels so any kernel up to `pad` half-size can be applied without
/// bounds checks.
struct PaddedImage {
    data: Vec<f32>,
    stride: usize,
    pad: usize,
    width: usize,
    height: usize,
}

impl PaddedImage {
    fn new<I: ImageAccess>(image: &I, pad: usize) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let stride = width + 2 * pad;
        let rows = height + 2 * pad;
        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;

        let mut data = Vec::with_capacity(stride * rows);
        for py in 0..rows {
            let y = (py as i64 - pad as i64).clamp(0, max_y) as i32;
            for px in 0..stride {
                let x = (px as i64 - pad as i64).clamp(0, max_x) as i32;
                data.push(image.get_pixel(x, y) as f32 / 255.0);
            }
        }

        Self {
            data,
            stride,
            pad,
            width,
            height,
        }
    }

    /// Mean complex magnitude of the kernel response over every pixel.
    fn mean_magnitude(&self, kernel: &Kernel) -> f32 {
        let half = kernel.half_size();
        let side = kernel.size();
        let origin = self.pad - half;
        let (real, imag) = (kernel.real(), kernel.imag());

        let mut total = 0.0f64;
        for y in 0..self.height {
            for x in 0..self.width {
                let mut re = 0.0f32;
                let mut im = 0.0f32;
                for ky in 0..side {
                    let row = (y + origin + ky) * self.stride + x + origin;
                    let pixels = &self.data[row..row + side];
                    let taps = ky * side..(ky + 1) * side;
                    for ((p, kr), ki) in pixels.iter().zip(&real[taps.clone()]).zip(&imag[taps]) {
                        re += p * kr;
                        im += p * ki;
                    }
                }
                total += (re * re + im * im).sqrt() as f64;
            }
        }

        (total / (self.width * self.height) as f64) as f32
    }
}

fn check_image<I: ImageAccess>(image: &I) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidInput(format!(
            "image has zero dimension ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Filter `image` with every kernel of `bank` and summarize each response
/// by its mean magnitude.
///
/// The result has exactly `bank.len()` components in bank order, whatever
/// the image resolution.
pub fn extract<I: ImageAccess>(image: &I, bank: &FilterBank) -> Result<FeatureVector> {
    check_image(image)?;
    if bank.is_empty() {
        return Err(Error::Config("cannot extract features with an empty filter bank".into()));
    }

    let pad = bank.iter().map(Kernel::half_size).max().unwrap_or(0);
    let padded = PaddedImage::new(image, pad);

    let values = bank.iter().map(|k| padded.mean_magnitude(k)).collect();
    Ok(FeatureVector(values))
}

/// A filter bank bound to the working size every face crop is normalized to.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    bank: FilterBank,
    width: u32,
    height: u32,
}

impl FeatureExtractor {
    pub fn new(bank: FilterBank, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!(
                "working size must be non-zero, got {}x{}",
                width, height
            )));
        }
        if bank.is_empty() {
            return Err(Error::Config("filter bank is empty".into()));
        }
        Ok(Self {
            bank,
            width,
            height,
        })
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn working_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Length of every vector this extractor produces.
    pub fn num_features(&self) -> usize {
        self.bank.len()
    }

    /// Extract features from a crop that is already at the working size.
    pub fn extract<I: ImageAccess>(&self, image: &I) -> Result<FeatureVector> {
        check_image(image)?;
        if (image.width(), image.height()) != (self.width, self.height) {
            return Err(Error::InvalidInput(format!(
                "image is {}x{}, working size is {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            )));
        }
        extract(image, &self.bank)
    }
}
