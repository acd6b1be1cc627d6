//! One-vs-all voting over per-emotion classifiers.
//!
//! Every registered classifier votes independently on the same feature
//! vector, so zero, one or several of them may fire at once. The winner is
//! chosen by, in order:
//!
//! 1. fired votes beat votes that did not fire;
//! 2. higher confidence wins;
//! 3. on equal confidence, the label declared first in [`EmotionLabel`]
//!    wins.
//!
//! When nothing fired this yields the least negative vote, so the ensemble
//! always produces a label. An ensemble with no classifiers at all answers
//! [`EmotionLabel::Neutral`] with a score of zero.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::classifier::EmotionClassifier;
use crate::error::{Error, Result};
use crate::features::FeatureVector;
use crate::types::{Decision, EmotionLabel, VoteResult};

/// Decision returned when there are no votes to choose from.
pub const EMPTY_DECISION: Decision = Decision {
    label: EmotionLabel::Neutral,
    score: 0.0,
};

/// A set of classifiers, at most one per emotion.
#[derive(Debug, Clone, Default)]
pub struct VotingEnsemble {
    classifiers: BTreeMap<EmotionLabel, EmotionClassifier>,
}

impl VotingEnsemble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classifier.
    ///
    /// A second classifier for an already registered label is rejected, as
    /// is one whose input length differs from the classifiers already
    /// present.
    pub fn add_classifier(&mut self, classifier: EmotionClassifier) -> Result<()> {
        let label = classifier.label();
        if self.classifiers.contains_key(&label) {
            return Err(Error::DuplicateLabel(label));
        }
        if let Some(expected) = self.num_features() {
            if classifier.num_features() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: classifier.num_features(),
                });
            }
        }

        self.classifiers.insert(label, classifier);
        Ok(())
    }

    /// Feature vector length shared by every registered classifier, or
    /// `None` when the ensemble is empty.
    pub fn num_features(&self) -> Option<usize> {
        self.classifiers.values().next().map(|c| c.num_features())
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    pub fn contains(&self, label: EmotionLabel) -> bool {
        self.classifiers.contains_key(&label)
    }

    pub fn labels(&self) -> impl Iterator<Item = EmotionLabel> + '_ {
        self.classifiers.keys().copied()
    }

    /// Collect every classifier's vote, in label declaration order.
    pub fn votes(&self, features: &FeatureVector) -> Result<Vec<VoteResult>> {
        self.classifiers
            .values()
            .map(|c| c.predict(features))
            .collect()
    }

    /// Run every classifier and pick a single winning emotion.
    pub fn predict_majority(&self, features: &FeatureVector) -> Result<Decision> {
        let votes = self.votes(features)?;
        Ok(Self::decide(&votes))
    }

    /// Pick the winning emotion from votes already collected with
    /// [`VotingEnsemble::votes`].
    ///
    /// The outcome does not depend on the order of `votes`.
    pub fn decide(votes: &[VoteResult]) -> Decision {
        for vote in votes {
            log::debug!(
                "{:>8}: fired={} confidence={:.4}",
                vote.label,
                vote.fired,
                vote.confidence
            );
        }

        let decision = select(votes);
        log::debug!("decision: {} ({:.4})", decision.label, decision.score);
        decision
    }
}

fn select(votes: &[VoteResult]) -> Decision {
    votes
        .iter()
        .min_by(|a, b| precedence(a, b))
        .map(|v| Decision {
            label: v.label,
            score: v.confidence,
        })
        .unwrap_or(EMPTY_DECISION)
}

/// `Less` when `a` should win over `b`.
///
/// Confidences are finite once a model has been validated. `-0.0` and `0.0`
/// compare equal here, so they fall through to the label order.
fn precedence(a: &VoteResult, b: &VoteResult) -> Ordering {
    b.fired
        .cmp(&a.fired)
        .then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.label.cmp(&b.label))
}
