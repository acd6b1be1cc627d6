use std::path::Path;

use crate::error::{Error, Result};
use crate::features::FeatureVector;
use crate::model::BoostedModel;
use crate::types::{EmotionLabel, VoteResult};

/// A boosted binary classifier bound to the emotion it was trained to
/// recognize.
#[derive(Debug, Clone)]
pub struct EmotionClassifier {
    label: EmotionLabel,
    model: BoostedModel,
}

impl EmotionClassifier {
    /// Bind `model` to `label`.
    ///
    /// The model is checked the same way [`BoostedModel::load`] checks it, so
    /// a hand-assembled model that splits on a missing feature or loops
    /// between nodes is rejected here instead of failing in `predict`.
    pub fn new(label: EmotionLabel, model: BoostedModel) -> Result<Self> {
        model.validate().map_err(Error::Config)?;
        Ok(Self { label, model })
    }

    /// Load a model file and bind it to the emotion its file name starts
    /// with, e.g. `anger_tree_v1.xml` binds to [`EmotionLabel::Anger`].
    ///
    /// Only the final path component is matched, so models can live in any
    /// directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let label =
            EmotionLabel::from_model_name(&name).ok_or_else(|| Error::UnrecognizedLabel(name))?;
        let model = BoostedModel::load(path)?;

        log::info!(
            "loaded {} classifier from {} ({} trees, {} features)",
            label,
            path.display(),
            model.num_trees(),
            model.num_features()
        );

        Ok(Self { label, model })
    }

    pub fn label(&self) -> EmotionLabel {
        self.label
    }

    pub fn model(&self) -> &BoostedModel {
        &self.model
    }

    /// Feature vector length the underlying model was trained on.
    pub fn num_features(&self) -> usize {
        self.model.num_features()
    }

    /// Vote on one feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<VoteResult> {
        if features.len() != self.model.num_features() {
            return Err(Error::DimensionMismatch {
                expected: self.model.num_features(),
                actual: features.len(),
            });
        }

        let confidence = self.model.margin(features.as_slice());
        Ok(VoteResult {
            label: self.label,
            fired: confidence > 0.0,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::BoostedModelBuilder;
    use crate::tree::{DecisionTree, TreeEnsemble, TreeNode, WeightedTree};

    fn model() -> BoostedModel {
        BoostedModelBuilder::new()
            .num_features(3)
            .add_tree(WeightedTree::new(0.8, DecisionTree::stump(1, 0.0, -1.0, 1.0)))
            .build()
            .unwrap()
    }

    fn model_dir(test: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "facemotion-classifier-{}-{}",
            std::process::id(),
            test
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn predict_reports_vote_and_margin() {
        let classifier = EmotionClassifier::new(EmotionLabel::Happy, model()).unwrap();

        let vote = classifier.predict(&FeatureVector::new(vec![0.0, 2.0, 0.0])).unwrap();
        assert_eq!(vote.label, EmotionLabel::Happy);
        assert!(vote.fired);
        assert!((vote.confidence - 0.8).abs() < 1e-6);

        let vote = classifier.predict(&FeatureVector::new(vec![0.0, -2.0, 0.0])).unwrap();
        assert!(!vote.fired);
        assert!((vote.confidence + 0.8).abs() < 1e-6);
    }

    #[test]
    fn predict_is_deterministic() {
        let classifier = EmotionClassifier::new(EmotionLabel::Fear, model()).unwrap();
        let features = FeatureVector::new(vec![0.3, 0.1, -0.2]);
        let first = classifier.predict(&features).unwrap();
        for _ in 0..10 {
            assert_eq!(classifier.predict(&features).unwrap(), first);
        }
    }

    #[test]
    fn predict_checks_dimension() {
        let classifier = EmotionClassifier::new(EmotionLabel::Anger, model()).unwrap();
        let err = classifier.predict(&FeatureVector::new(vec![0.0; 4])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn new_rejects_unchecked_models() {
        // Splits on feature 7 of a 2-feature input.
        let out_of_range = BoostedModel::new(
            2,
            0.0,
            TreeEnsemble::new(vec![WeightedTree::new(
                1.0,
                DecisionTree::stump(7, 0.0, -1.0, 1.0),
            )]),
        );
        let err = EmotionClassifier::new(EmotionLabel::Happy, out_of_range).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        // Root points back at itself.
        let cycle = BoostedModel::new(
            2,
            0.0,
            TreeEnsemble::new(vec![WeightedTree::new(
                1.0,
                DecisionTree::new(vec![TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                }]),
            )]),
        );
        let err = EmotionClassifier::new(EmotionLabel::Happy, cycle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn load_binds_label_from_file_name() {
        let dir = model_dir("bind");
        let path = dir.join("anger_tree_v1.xml");
        model().save(&path).unwrap();

        let classifier = EmotionClassifier::load(&path).unwrap();
        assert_eq!(classifier.label(), EmotionLabel::Anger);
        assert_eq!(classifier.num_features(), 3);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn load_rejects_unknown_prefix() {
        let dir = model_dir("unknown");
        let path = dir.join("unknown_v2.xml");
        model().save(&path).unwrap();

        let err = EmotionClassifier::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedLabel);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn load_reports_corrupt_model() {
        let dir = model_dir("corrupt");
        let path = dir.join("sadness_boost.bin");
        std::fs::write(&path, b"").unwrap();

        let err = EmotionClassifier::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);

        std::fs::remove_dir_all(dir).ok();
    }
}
