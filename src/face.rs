//! Turning a full photograph into a working-size face crop.
//!
//! Face detection itself is left to a [`FaceLocator`] implementation; this
//! module only crops the located box and resizes it.

use ::image::imageops::{self, FilterType};

use crate::error::{Error, Result};
use crate::features::GrayImage;
use crate::types::BoundingBox;

/// Anything that can find a face in a grayscale photograph.
pub trait FaceLocator {
    /// Return the face to classify, or `None` if there is none.
    fn locate(&mut self, image: &::image::GrayImage) -> Option<BoundingBox>;
}

impl<F> FaceLocator for F
where
    F: FnMut(&::image::GrayImage) -> Option<BoundingBox>,
{
    fn locate(&mut self, image: &::image::GrayImage) -> Option<BoundingBox> {
        self(image)
    }
}

/// Crop `bbox` out of `image` and resize it to `width` x `height`.
pub fn crop_to_working_size(
    image: &::image::GrayImage,
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    let (x, y, w, h) = bbox.clip_to(image.width(), image.height()).ok_or_else(|| {
        Error::InvalidInput(format!(
            "face box {:?} lies outside the {}x{} image",
            bbox,
            image.width(),
            image.height()
        ))
    })?;

    let cropped = imageops::crop_imm(image, x, y, w, h).to_image();
    let scaled = imageops::resize(&cropped, width, height, FilterType::Triangle);
    Ok(GrayImage::from(scaled))
}

/// Locate the face in `image` and return it cropped to the working size.
pub fn crop_face<L: FaceLocator + ?Sized>(
    locator: &mut L,
    image: &::image::GrayImage,
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    let bbox = locator.locate(image).ok_or(Error::NoFaceDetected)?;
    log::debug!(
        "face at ({:.0}, {:.0}) {:.0}x{:.0}",
        bbox.x,
        bbox.y,
        bbox.width,
        bbox.height
    );
    crop_to_working_size(image, &bbox, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::features::ImageAccess;

    fn photo() -> ::image::GrayImage {
        ::image::GrayImage::from_fn(100, 80, |x, _| ::image::Luma([if x < 50 { 10 } else { 240 }]))
    }

    #[test]
    fn crop_resizes_to_working_size() {
        let mut locator = |_: &::image::GrayImage| Some(BoundingBox::new(60.0, 10.0, 30.0, 40.0));
        let face = crop_face(&mut locator, &photo(), 16, 24).unwrap();
        assert_eq!((face.width(), face.height()), (16, 24));
        // Entirely inside the bright half.
        assert!(face.as_raw().iter().all(|&p| p == 240));
    }

    #[test]
    fn no_face_is_reported() {
        let mut locator = |_: &::image::GrayImage| -> Option<BoundingBox> { None };
        let err = crop_face(&mut locator, &photo(), 16, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFaceDetected);
    }

    #[test]
    fn box_outside_image_is_invalid() {
        let bbox = BoundingBox::new(500.0, 500.0, 10.0, 10.0);
        let err = crop_to_working_size(&photo(), &bbox, 16, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
