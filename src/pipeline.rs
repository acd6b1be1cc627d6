use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::EmotionClassifier;
use crate::ensemble::VotingEnsemble;
use crate::error::{Error, Result};
use crate::face::{crop_face, FaceLocator};
use crate::features::{FeatureExtractor, FeatureVector, GrayImage};
use crate::gabor::{BankShape, FilterBank};
use crate::types::Decision;

/// Working size and filter bank dimensions.
///
/// Every field has a default, so a JSON config only needs the values it
/// changes:
///
/// ```json
/// { "width": 64, "height": 64, "nthetas": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width every face crop is resized to.
    pub width: u32,
    /// Height every face crop is resized to.
    pub height: u32,
    pub nwidths: usize,
    pub nlambdas: usize,
    pub nthetas: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 48,
            height: 48,
            nwidths: 2,
            nlambdas: 2,
            nthetas: 4,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn bank_shape(&self) -> BankShape {
        BankShape::new(self.nwidths, self.nlambdas, self.nthetas)
    }
}

/// Feature extraction and voting wired together for one configuration.
pub struct EmotionPipeline {
    extractor: FeatureExtractor,
    ensemble: VotingEnsemble,
}

impl EmotionPipeline {
    /// Build the filter bank for `config` and attach `ensemble`.
    ///
    /// Fails if the classifiers were trained on vectors of a different
    /// length than this bank produces.
    pub fn new(config: &PipelineConfig, ensemble: VotingEnsemble) -> Result<Self> {
        let bank = FilterBank::from_shape(config.bank_shape())?;
        let extractor = FeatureExtractor::new(bank, config.width, config.height)?;

        if let Some(expected) = ensemble.num_features() {
            if expected != extractor.num_features() {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: extractor.num_features(),
                });
            }
        }

        log::info!(
            "pipeline ready: {}x{} crops, {} features, {} classifiers",
            config.width,
            config.height,
            extractor.num_features(),
            ensemble.len()
        );

        Ok(Self {
            extractor,
            ensemble,
        })
    }

    /// Load one classifier per path and build the pipeline around them.
    pub fn from_model_paths<P: AsRef<Path>>(config: &PipelineConfig, paths: &[P]) -> Result<Self> {
        let mut ensemble = VotingEnsemble::new();
        for path in paths {
            ensemble.add_classifier(EmotionClassifier::load(path)?)?;
        }
        Self::new(config, ensemble)
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn ensemble(&self) -> &VotingEnsemble {
        &self.ensemble
    }

    pub fn features(&self, face: &GrayImage) -> Result<FeatureVector> {
        self.extractor.extract(face)
    }

    /// Classify a face crop that is already at the working size.
    pub fn classify(&self, face: &GrayImage) -> Result<Decision> {
        let features = self.extractor.extract(face)?;
        self.ensemble.predict_majority(&features)
    }

    /// Locate, crop and classify the face in a full photograph.
    pub fn classify_photo<L: FaceLocator + ?Sized>(
        &self,
        locator: &mut L,
        photo: &::image::GrayImage,
    ) -> Result<Decision> {
        let (width, height) = self.extractor.working_size();
        let face = crop_face(locator, photo, width, height)?;
        self.classify(&face)
    }

    /// Classify independent face crops in parallel. Results are in input
    /// order.
    pub fn classify_batch(&self, faces: &[GrayImage]) -> Vec<Result<Decision>> {
        faces.par_iter().map(|face| self.classify(face)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::BoostedModelBuilder;
    use crate::tree::{DecisionTree, WeightedTree};
    use crate::types::EmotionLabel;

    fn classifier(label: EmotionLabel, num_features: usize) -> EmotionClassifier {
        let model = BoostedModelBuilder::new()
            .num_features(num_features)
            .add_tree(WeightedTree::new(1.0, DecisionTree::stump(0, 0.01, -1.0, 1.0)))
            .build()
            .unwrap();
        EmotionClassifier::new(label, model).unwrap()
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let path = std::env::temp_dir().join(format!("facemotion-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "width": 64, "nthetas": 8 }"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 48);
        assert_eq!(config.bank_shape(), BankShape::new(2, 2, 8));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn bad_config_file_is_config_error() {
        let err = PipelineConfig::from_json_file("/nonexistent/facemotion.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn zero_bank_dimension_is_rejected() {
        let config = PipelineConfig {
            nlambdas: 0,
            ..Default::default()
        };
        let err = EmotionPipeline::new(&config, VotingEnsemble::new()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn ensemble_must_match_bank_size() {
        let mut ensemble = VotingEnsemble::new();
        ensemble.add_classifier(classifier(EmotionLabel::Happy, 12)).unwrap();

        let err = EmotionPipeline::new(&PipelineConfig::default(), ensemble).err().unwrap();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 12,
                actual: 16
            }
        ));
    }

    #[test]
    fn batch_matches_sequential() {
        let config = PipelineConfig {
            width: 16,
            height: 16,
            ..Default::default()
        };
        let mut ensemble = VotingEnsemble::new();
        ensemble.add_classifier(classifier(EmotionLabel::Happy, 16)).unwrap();
        ensemble.add_classifier(classifier(EmotionLabel::Fear, 16)).unwrap();
        let pipeline = EmotionPipeline::new(&config, ensemble).unwrap();

        let faces: Vec<_> = (0..6u32)
            .map(|i| GrayImage::from_fn(16, 16, move |x, y| ((x * (i + 1) + y * 3) % 256) as u8))
            .collect();
        let wrong_size = GrayImage::from_fn(8, 8, |_, _| 0);

        let mut inputs = faces.clone();
        inputs.push(wrong_size);
        let batch = pipeline.classify_batch(&inputs);
        assert_eq!(batch.len(), 7);

        for (face, result) in faces.iter().zip(&batch) {
            assert_eq!(result.as_ref().unwrap(), &pipeline.classify(face).unwrap());
        }
        assert_eq!(
            batch[6].as_ref().unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
