use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{Error, LoadError, Result};
use crate::tree::{TreeEnsemble, WeightedTree};

/// On-disk encoding of a model, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFormat {
    Bincode,
    Bzip2Bincode,
    Json,
}

impl ModelFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bz2") => ModelFormat::Bzip2Bincode,
            Some("json") => ModelFormat::Json,
            _ => ModelFormat::Bincode,
        }
    }
}

/// A trained boosted binary classifier.
///
/// The model is a weighted sum of weak decision trees over feature vector
/// components. The raw sum minus `threshold` is the decision margin: the
/// classifier fires when the margin is positive.
///
/// # Usage
///
/// ```ignore
/// let model = BoostedModel::load("happy_boost.bin")?;
/// let margin = model.margin(features.as_slice());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    /// Length of the feature vectors the model was trained on.
    num_features: usize,

    /// Decision threshold subtracted from the ensemble sum.
    threshold: f32,

    ensemble: TreeEnsemble,
}

impl BoostedModel {
    /// Create a model without validation. Use [`BoostedModelBuilder`] for
    /// checked construction.
    pub fn new(num_features: usize, threshold: f32, ensemble: TreeEnsemble) -> Self {
        Self {
            num_features,
            threshold,
            ensemble,
        }
    }

    /// Load a model from a file.
    ///
    /// `.json` files are read as JSON, `.bz2` files as bzip2-compressed
    /// bincode, and anything else as plain bincode.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::read(path).map_err(|e| Error::load(path, e))
    }

    fn read(path: &Path) -> std::result::Result<Self, LoadError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let model: Self = match ModelFormat::for_path(path) {
            ModelFormat::Json => serde_json::from_reader(reader)?,
            ModelFormat::Bzip2Bincode => {
                let mut bytes = Vec::new();
                BzDecoder::new(reader).read_to_end(&mut bytes)?;
                bincode::deserialize(&bytes)?
            }
            ModelFormat::Bincode => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                bincode::deserialize(&bytes)?
            }
        };

        model.validate().map_err(LoadError::InvalidModel)?;
        Ok(model)
    }

    /// Save the model, picking the encoding from the extension the same way
    /// [`BoostedModel::load`] does.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        match ModelFormat::for_path(path) {
            ModelFormat::Json => serde_json::to_writer_pretty(&mut writer, self)?,
            ModelFormat::Bzip2Bincode => {
                let mut encoder = BzEncoder::new(&mut writer, Compression::best());
                encoder.write_all(&bincode::serialize(self)?)?;
                encoder.finish()?;
            }
            ModelFormat::Bincode => writer.write_all(&bincode::serialize(self)?)?,
        }

        writer.flush()?;
        Ok(())
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.num_features == 0 {
            return Err("model expects zero features".into());
        }
        if !self.threshold.is_finite() {
            return Err("decision threshold is not finite".into());
        }
        if self.ensemble.is_empty() {
            return Err("ensemble has no trees".into());
        }
        for (i, weighted) in self.ensemble.trees.iter().enumerate() {
            if !weighted.weight.is_finite() {
                return Err(format!("tree {} has non-finite weight", i));
            }
            weighted
                .tree
                .check(self.num_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Get the feature vector length this model expects.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Get the number of weak learners.
    pub fn num_trees(&self) -> usize {
        self.ensemble.len()
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    /// Signed distance of the ensemble sum from the decision threshold.
    ///
    /// Callers must have checked `features.len() == self.num_features()`.
    pub fn margin(&self, features: &[f32]) -> f32 {
        self.ensemble.predict(features) - self.threshold
    }
}

/// Builder for creating a BoostedModel.
pub struct BoostedModelBuilder {
    num_features: Option<usize>,
    threshold: f32,
    trees: Vec<WeightedTree>,
}

impl BoostedModelBuilder {
    pub fn new() -> Self {
        Self {
            num_features: None,
            threshold: 0.0,
            trees: Vec::new(),
        }
    }

    /// Set the input length the model was trained on.
    pub fn num_features(mut self, n: usize) -> Self {
        self.num_features = Some(n);
        self
    }

    /// Set the decision threshold (defaults to zero).
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Add a weighted weak learner.
    pub fn add_tree(mut self, tree: WeightedTree) -> Self {
        self.trees.push(tree);
        self
    }

    /// Build the BoostedModel.
    pub fn build(self) -> Result<BoostedModel> {
        let num_features = self
            .num_features
            .ok_or_else(|| Error::Config("boosted model needs a feature count".into()))?;

        let model = BoostedModel::new(num_features, self.threshold, TreeEnsemble::new(self.trees));
        model.validate().map_err(Error::Config)?;
        Ok(model)
    }
}

impl Default for BoostedModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tree::DecisionTree;

    fn create_stump_model() -> BoostedModel {
        BoostedModelBuilder::new()
            .num_features(4)
            .threshold(0.25)
            .add_tree(WeightedTree::new(1.0, DecisionTree::stump(0, 0.5, -1.0, 1.0)))
            .add_tree(WeightedTree::new(0.5, DecisionTree::stump(3, 0.0, -1.0, 1.0)))
            .build()
            .unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("facemotion-model-{}-{}", std::process::id(), name))
    }

    #[test]
    fn margin_subtracts_threshold() {
        let model = create_stump_model();
        assert_eq!(model.num_features(), 4);
        assert_eq!(model.num_trees(), 2);

        // 1.0 + 0.5 - 0.25
        assert!((model.margin(&[1.0, 0.0, 0.0, 1.0]) - 1.25).abs() < 1e-6);
        // -1.0 - 0.5 - 0.25
        assert!((model.margin(&[0.0, 0.0, 0.0, -1.0]) - (-1.75)).abs() < 1e-6);
    }

    #[test]
    fn builder_validates() {
        let missing = BoostedModelBuilder::new().build().unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Config);

        let no_trees = BoostedModelBuilder::new().num_features(2).build().unwrap_err();
        assert_eq!(no_trees.kind(), ErrorKind::Config);

        let out_of_range = BoostedModelBuilder::new()
            .num_features(2)
            .add_tree(WeightedTree::new(1.0, DecisionTree::stump(2, 0.0, -1.0, 1.0)))
            .build()
            .unwrap_err();
        assert_eq!(out_of_range.kind(), ErrorKind::Config);
    }

    #[test]
    fn save_and_load_every_format() {
        let model = create_stump_model();

        for name in ["stump.bin", "stump.json", "stump.bin.bz2"] {
            let path = temp_path(name);
            model.save(&path).unwrap();
            let loaded = BoostedModel::load(&path).unwrap();
            assert_eq!(loaded, model, "format {}", name);
            std::fs::remove_file(path).ok();
        }
    }

    #[test]
    fn load_rejects_corrupt_and_missing_files() {
        let path = temp_path("garbage.bin");
        std::fs::write(&path, b"\x01\x02not a model").unwrap();
        let err = BoostedModel::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        std::fs::remove_file(path).ok();

        let err = BoostedModel::load(temp_path("does-not-exist.bin")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }

    #[test]
    fn load_rejects_structurally_invalid_model() {
        // Deserializes fine but splits on a feature the model does not have.
        let bad = BoostedModel::new(
            2,
            0.0,
            TreeEnsemble::new(vec![WeightedTree::new(
                1.0,
                DecisionTree::stump(7, 0.0, -1.0, 1.0),
            )]),
        );
        let path = temp_path("invalid.json");
        bad.save(&path).unwrap();

        match BoostedModel::load(&path) {
            Err(Error::Load {
                source: LoadError::InvalidModel(msg),
                ..
            }) => assert!(msg.contains("feature 7"), "{}", msg),
            other => panic!("expected invalid model error, got {:?}", other),
        }
        std::fs::remove_file(path).ok();
    }
}
