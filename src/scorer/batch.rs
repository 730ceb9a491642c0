use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::calibrate::{AestheticScore, RawScore};
use crate::error::{ErrorKind, ScoreError};

/// A successfully scored image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredImage {
    pub index: usize,
    pub score: AestheticScore,
    pub raw_score: RawScore,
    /// Width before resizing.
    pub width: u32,
    /// Height before resizing.
    pub height: u32,
    pub format: String,
}

impl ScoredImage {
    /// `"WxH"` of the original image.
    pub fn image_size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// An image that could not be scored, at its original position.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub index: usize,
    pub error: ScoreError,
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Failure", 3)?;
        s.serialize_field("index", &self.index)?;
        s.serialize_field("kind", &self.error.kind())?;
        s.serialize_field("message", &self.error.to_string())?;
        s.end()
    }
}

/// Outcome of one slot in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Scored(ScoredImage),
    Failed(Failure),
}

impl ImageOutcome {
    pub fn index(&self) -> usize {
        match self {
            ImageOutcome::Scored(s) => s.index,
            ImageOutcome::Failed(f) => f.index,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, ImageOutcome::Scored(_))
    }

    pub fn scored(&self) -> Option<&ScoredImage> {
        match self {
            ImageOutcome::Scored(s) => Some(s),
            ImageOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ImageOutcome::Scored(_) => None,
            ImageOutcome::Failed(f) => Some(f),
        }
    }
}

/// Per-image outcomes in input order, with aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub outcomes: Vec<ImageOutcome>,
    pub total_images: usize,
    pub successful_images: usize,
}

impl BatchResult {
    pub fn new(outcomes: Vec<ImageOutcome>) -> BatchResult {
        let successful_images = outcomes.iter().filter(|o| o.is_scored()).count();
        BatchResult {
            total_images: outcomes.len(),
            successful_images,
            outcomes,
        }
    }

    pub fn failed_images(&self) -> usize {
        self.total_images - self.successful_images
    }

    /// Scores in input order; `None` where the image failed.
    pub fn scores(&self) -> Vec<Option<f64>> {
        self.outcomes
            .iter()
            .map(|o| o.scored().map(|s| s.score.value()))
            .collect()
    }
}
