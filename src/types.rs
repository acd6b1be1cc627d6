use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of emotions a classifier can be trained for.
///
/// Declaration order is significant: it is the iteration order of
/// [`EmotionLabel::ALL`], the prefix matching order for model files, and the
/// tie-break priority of the voting ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Neutral,
    Anger,
    Contempt,
    Disgust,
    Fear,
    Happy,
    Sadness,
    Surprise,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 8] = [
        EmotionLabel::Neutral,
        EmotionLabel::Anger,
        EmotionLabel::Contempt,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Sadness,
        EmotionLabel::Surprise,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Contempt => "contempt",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
        }
    }

    /// Find the label a model file name starts with.
    ///
    /// Matching is case-sensitive and anchored at position 0; labels are
    /// tried in declaration order and the first match wins.
    pub fn from_model_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| name.starts_with(label.as_str()))
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One classifier's opinion about one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoteResult {
    pub label: EmotionLabel,
    /// Whether the classifier recognized its emotion.
    pub fired: bool,
    /// Signed margin from the decision threshold; positive exactly when `fired`.
    pub confidence: f32,
}

/// Final output of the ensemble for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub label: EmotionLabel,
    pub score: f32,
}

/// A bounding box defined by top-left corner, width, and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersect with an image of the given size and snap to whole pixels.
    ///
    /// Returns `(x, y, width, height)`, or `None` when nothing of the box
    /// lies inside the image.
    pub fn clip_to(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0.0).floor();
        let y0 = self.y.max(0.0).floor();
        let x1 = (self.x + self.width).min(image_width as f32).ceil();
        let y1 = (self.y + self.height).min(image_height as f32).ceil();

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}
