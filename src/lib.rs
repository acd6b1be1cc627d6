//! # facemotion
//!
//! Pure Rust facial emotion classification from a single face crop.
//!
//! This crate provides:
//! - **Texture features**: a Gabor filter bank swept over scale, frequency
//!   and orientation, reduced to one magnitude per kernel
//! - **Boosted classifiers**: inference for per-emotion boosted decision
//!   tree ensembles, bound to their emotion by model file name
//! - **One-vs-all voting**: a deterministic majority decision over any
//!   subset of the eight supported emotions
//!
//! ## Algorithm Overview
//!
//! 1. Crop the face and resize it to the working size
//! 2. Convolve the crop with every kernel of the filter bank and keep the
//!    mean response magnitude of each
//! 3. Let every emotion classifier vote on the resulting feature vector
//! 4. Prefer classifiers that fired, then the highest confidence, then the
//!    earliest emotion in declaration order
//!
//! ## Quick Start
//!
//! ```rust
//! use facemotion::{
//!     BoostedModelBuilder, DecisionTree, EmotionClassifier, EmotionLabel, EmotionPipeline,
//!     GrayImage, PipelineConfig, VotingEnsemble, WeightedTree,
//! };
//!
//! let config = PipelineConfig {
//!     width: 24,
//!     height: 24,
//!     nwidths: 1,
//!     nlambdas: 2,
//!     nthetas: 4,
//! };
//!
//! // Load trained models with EmotionClassifier::load("happy_boost.bin"),
//! // or assemble one by hand:
//! let model = BoostedModelBuilder::new()
//!     .num_features(8)
//!     .add_tree(WeightedTree::new(1.0, DecisionTree::stump(0, 0.05, -1.0, 1.0)))
//!     .build()
//!     .unwrap();
//!
//! let mut ensemble = VotingEnsemble::new();
//! ensemble
//!     .add_classifier(EmotionClassifier::new(EmotionLabel::Happy, model).unwrap())
//!     .unwrap();
//!
//! let pipeline = EmotionPipeline::new(&config, ensemble).unwrap();
//!
//! let face = GrayImage::from_fn(24, 24, |x, y| ((x * 11 + y * 5) % 256) as u8);
//! let decision = pipeline.classify(&face).unwrap();
//! println!("{} ({:.3})", decision.label, decision.score);
//! ```
//!
//! ## Custom Image Types
//!
//! Implement the [`ImageAccess`] trait for your own image types:
//!
//! ```rust
//! use facemotion::ImageAccess;
//!
//! struct MyImage { /* ... */ }
//!
//! impl ImageAccess for MyImage {
//!     fn get_pixel(&self, x: i32, y: i32) -> u8 {
//!         // Return grayscale intensity at (x, y)
//!         // Return 0 for out-of-bounds
//!         0
//!     }
//!     fn width(&self) -> u32 { 48 }
//!     fn height(&self) -> u32 { 48 }
//! }
//! ```

mod classifier;
mod ensemble;
mod error;
pub mod face;
mod features;
mod gabor;
mod model;
mod pipeline;
mod tree;
mod types;

pub use classifier::EmotionClassifier;
pub use ensemble::{VotingEnsemble, EMPTY_DECISION};
pub use error::{Error, ErrorKind, LoadError, Result};
pub use face::FaceLocator;
pub use features::{extract, FeatureExtractor, FeatureVector, GrayImage, ImageAccess};
pub use gabor::{BankShape, FilterBank, Kernel, KernelParams};
pub use model::{BoostedModel, BoostedModelBuilder};
pub use pipeline::{EmotionPipeline, PipelineConfig};
pub use tree::{DecisionTree, TreeEnsemble, TreeNode, WeightedTree};
pub use types::{BoundingBox, Decision, EmotionLabel, VoteResult};
