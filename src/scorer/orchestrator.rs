use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::config::ScorerConfig;
use crate::error::ScoreError;
use crate::network::model::{ModelSlot, ScoringModel};
use crate::preprocess::normalizer::{NormalizedTensor, Normalizer, RawImage};
use crate::scorer::batch::{BatchResult, Failure, ImageOutcome, ScoredImage};
use crate::scorer::cancel::CancelFlag;

/// Runs images through normalize → forward pass → calibrate.
///
/// Cloning is cheap and every clone shares the same model slot, so a single
/// `Scorer` can be handed to any number of request threads.
#[derive(Debug, Clone)]
pub struct Scorer {
    slot: Arc<ModelSlot>,
    config: ScorerConfig,
}

impl Scorer {
    /// A scorer with no model yet.  Calls fail with `ModelNotLoaded` until
    /// `install_model` succeeds.
    pub fn new(config: ScorerConfig) -> Scorer {
        Scorer {
            slot: Arc::new(ModelSlot::new()),
            config: ScorerConfig { batch_size: config.batch_size.max(1), ..config },
        }
    }

    pub fn with_model(model: Arc<dyn ScoringModel>, config: ScorerConfig) -> Result<Scorer, ScoreError> {
        let scorer = Scorer::new(config);
        scorer.install_model(model)?;
        Ok(scorer)
    }

    pub fn install_model(&self, model: Arc<dyn ScoringModel>) -> Result<(), ScoreError> {
        self.slot.install(model)
    }

    /// Readiness signal: true once weights are installed.
    pub fn is_ready(&self) -> bool {
        self.slot.is_loaded()
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Scores a single image.  This is a batch of one through the same path as
    /// `score_many`, so single and batch scores never drift apart.
    pub fn score_one(&self, image: &RawImage) -> Result<ScoredImage, ScoreError> {
        let result = self.score_many(std::slice::from_ref(image))?;
        match result.outcomes.into_iter().next() {
            Some(ImageOutcome::Scored(scored)) => Ok(scored),
            Some(ImageOutcome::Failed(failure)) => Err(failure.error),
            None => Err(ScoreError::Inference("no outcome produced".into())),
        }
    }

    pub fn score_many(&self, images: &[RawImage]) -> Result<BatchResult, ScoreError> {
        self.score_many_cancellable(images, &CancelFlag::new())
    }

    /// Scores `images`, isolating per-image failures.
    ///
    /// Fails as a whole only when no model is installed or `cancel` is set.
    /// Otherwise the result has one outcome per input, at the input's index.
    pub fn score_many_cancellable(
        &self,
        images: &[RawImage],
        cancel: &CancelFlag,
    ) -> Result<BatchResult, ScoreError> {
        let loaded = self.slot.get()?;
        let span = info_span!("score_many", total = images.len());
        let _enter = span.enter();
        let started = Instant::now();

        let normalizer = Normalizer::new(loaded.model.input_size())
            .with_max_image_bytes(self.config.max_image_bytes);

        // ── Normalize every image independently ─────────────────────────────
        let normalized: Vec<Result<NormalizedTensor, ScoreError>> = images
            .par_iter()
            .map(|image| {
                cancel.check()?;
                normalizer.normalize(image)
            })
            .collect();
        cancel.check()?;

        let mut slots: Vec<Option<ImageOutcome>> = vec![None; images.len()];
        let mut pending_index = Vec::with_capacity(images.len());
        let mut pending = Vec::with_capacity(images.len());
        for (index, result) in normalized.into_iter().enumerate() {
            match result {
                Ok(tensor) => {
                    pending_index.push(index);
                    pending.push(tensor);
                }
                Err(error) => {
                    warn!(index, error = %error, "image rejected before inference");
                    slots[index] = Some(ImageOutcome::Failed(Failure { index, error }));
                }
            }
        }

        // ── Forward passes, at most `batch_size` images each ────────────────
        for (indices, tensors) in pending_index
            .chunks(self.config.batch_size)
            .zip(pending.chunks(self.config.batch_size))
        {
            cancel.check()?;
            let outcomes = match loaded.model.infer(tensors) {
                Ok(raws) if raws.len() == tensors.len() => raws,
                Ok(raws) => {
                    let error = ScoreError::Inference(format!(
                        "model returned {} scores for {} images", raws.len(), tensors.len()
                    ));
                    vec![Err(error); tensors.len()]
                }
                Err(error) => {
                    warn!(images = tensors.len(), error = %error, "forward pass failed for whole chunk");
                    vec![Err(error); tensors.len()]
                }
            };

            for ((&index, tensor), outcome) in indices.iter().zip(tensors).zip(outcomes) {
                let slot = match outcome {
                    Ok(raw) => {
                        let score = loaded.calibrator.calibrate(raw);
                        debug!(index, raw, score = score.value(), "image scored");
                        let source = tensor.source();
                        ImageOutcome::Scored(ScoredImage {
                            index,
                            score,
                            raw_score: raw,
                            width: source.width,
                            height: source.height,
                            format: source.format.clone(),
                        })
                    }
                    Err(error) => {
                        warn!(index, error = %error, "inference failed");
                        ImageOutcome::Failed(Failure { index, error })
                    }
                };
                slots[index] = Some(slot);
            }
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    ImageOutcome::Failed(Failure {
                        index,
                        error: ScoreError::Inference("no outcome produced".into()),
                    })
                })
            })
            .collect();
        let result = BatchResult::new(outcomes);
        info!(
            successful = result.successful_images,
            failed = result.failed_images(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch scored"
        );
        Ok(result)
    }
}
