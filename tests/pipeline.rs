mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use food_aesthetics::network::model::ImageInference;
use food_aesthetics::{
    normalize, CancelFlag, ErrorKind, NormalizedTensor, RawImage, ScoreError, Scorer,
    ScorerConfig, ScoringModel, ScoringNetwork,
};

use common::{broken_image, gradient_jpeg, network, png_image, scorer, TEST_INPUT_SIZE};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Returns the image width as its raw score and fails the `fail_call`-th
/// forward pass as a whole.
struct ChunkFailingModel {
    calls: AtomicUsize,
    fail_call: usize,
}

impl ScoringModel for ChunkFailingModel {
    fn input_size(&self) -> u32 {
        8
    }

    fn infer(&self, batch: &[NormalizedTensor]) -> Result<Vec<ImageInference>, ScoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_call {
            return Err(ScoreError::Inference("device lost".into()));
        }
        Ok(batch.iter().map(|t| Ok(t.source().width as f64 / 100.0)).collect())
    }
}

/// Fails any image whose original width is odd.
struct OddWidthModel;

impl ScoringModel for OddWidthModel {
    fn input_size(&self) -> u32 {
        8
    }

    fn infer(&self, batch: &[NormalizedTensor]) -> Result<Vec<ImageInference>, ScoreError> {
        Ok(batch
            .iter()
            .map(|t| match t.source().width % 2 {
                0 => Ok(0.0),
                _ => Err(ScoreError::Inference("unexpected tensor".into())),
            })
            .collect())
    }
}

/// Scores everything, but sets `cancel` while the first chunk is running.
struct CancelsDuringFirstChunk {
    cancel: CancelFlag,
    calls: AtomicUsize,
}

impl ScoringModel for CancelsDuringFirstChunk {
    fn input_size(&self) -> u32 {
        8
    }

    fn infer(&self, batch: &[NormalizedTensor]) -> Result<Vec<ImageInference>, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        Ok(batch.iter().map(|_| Ok(1.0)).collect())
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[test]
fn scores_are_probabilities() {
    let scorer = scorer(4);
    let images = vec![png_image(64, 48), png_image(10, 200), RawImage::new(gradient_jpeg(80, 60), "jpg")];
    let result = scorer.score_many(&images).unwrap();
    assert_eq!(result.total_images, 3);
    assert_eq!(result.successful_images, 3);
    for score in result.scores() {
        let s = score.unwrap();
        assert!(s > 0.0 && s < 1.0, "score {} outside (0, 1)", s);
    }
}

#[test]
fn single_and_batch_scores_agree() {
    let scorer = scorer(3);
    let images: Vec<RawImage> = (1..=5).map(|i| png_image(20 * i, 30)).collect();
    let batch = scorer.score_many(&images).unwrap();
    for (i, image) in images.iter().enumerate() {
        let alone = scorer.score_one(image).unwrap();
        let together = batch.outcomes[i].scored().unwrap();
        assert!((alone.score.value() - together.score.value()).abs() < 1e-5);
    }
}

#[test]
fn chunk_size_does_not_change_scores() {
    let images: Vec<RawImage> = (1..=7).map(|i| png_image(15 * i, 40)).collect();
    let by_one = scorer(1).score_many(&images).unwrap().scores();
    let by_three = scorer(3).score_many(&images).unwrap().scores();
    let all = scorer(16).score_many(&images).unwrap().scores();
    for ((a, b), c) in by_one.iter().zip(&by_three).zip(&all) {
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!((a - b).abs() < 1e-5 && (a - c).abs() < 1e-5);
    }
}

#[test]
fn failed_image_keeps_its_position() {
    let images = vec![png_image(30, 30), broken_image(), png_image(40, 20)];
    let result = scorer(8).score_many(&images).unwrap();

    assert_eq!(result.outcomes.len(), 3);
    assert_eq!(result.successful_images, 2);
    for (i, outcome) in result.outcomes.iter().enumerate() {
        assert_eq!(outcome.index(), i);
    }
    assert!(result.outcomes[0].is_scored());
    assert_eq!(result.outcomes[1].failure().unwrap().kind(), ErrorKind::Decode);
    assert_eq!(result.outcomes[2].scored().unwrap().image_size(), "40x20");
}

#[test]
fn empty_batch_is_empty_result() {
    let result = scorer(8).score_many(&[]).unwrap();
    assert_eq!(result.total_images, 0);
    assert_eq!(result.successful_images, 0);
    assert!(result.outcomes.is_empty());
}

#[test]
fn all_failing_batch_reports_every_failure() {
    let images = vec![broken_image(), RawImage::new(Vec::new(), "png"), broken_image()];
    let result = scorer(2).score_many(&images).unwrap();
    assert_eq!(result.successful_images, 0);
    assert_eq!(result.failed_images(), 3);
    assert!(result
        .outcomes
        .iter()
        .all(|o| o.failure().map(|f| f.kind()) == Some(ErrorKind::Decode)));
}

#[test]
fn scoring_before_load_is_model_not_loaded() {
    let scorer = Scorer::new(ScorerConfig::default());
    assert!(!scorer.is_ready());
    assert_eq!(scorer.score_one(&png_image(8, 8)).unwrap_err(), ScoreError::ModelNotLoaded);
    assert_eq!(scorer.score_many(&[]).unwrap_err(), ScoreError::ModelNotLoaded);
}

#[test]
fn model_installs_once() {
    let scorer = Scorer::new(ScorerConfig::default());
    scorer.install_model(Arc::new(network(1))).unwrap();
    assert!(scorer.is_ready());
    let err = scorer.install_model(Arc::new(network(2))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);
}

#[test]
fn clones_share_the_model() {
    let scorer = Scorer::new(ScorerConfig::default());
    let clone = scorer.clone();
    scorer.install_model(Arc::new(network(1))).unwrap();
    assert!(clone.is_ready());
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[test]
fn whole_chunk_failure_only_affects_that_chunk() {
    let model = ChunkFailingModel { calls: AtomicUsize::new(0), fail_call: 1 };
    let scorer = Scorer::with_model(Arc::new(model), ScorerConfig::with_batch_size(2)).unwrap();
    let images: Vec<RawImage> = (1..=5).map(|i| png_image(10 * i, 10)).collect();

    let result = scorer.score_many(&images).unwrap();
    let kinds: Vec<Option<ErrorKind>> =
        result.outcomes.iter().map(|o| o.failure().map(|f| f.kind())).collect();
    assert_eq!(
        kinds,
        vec![None, None, Some(ErrorKind::Inference), Some(ErrorKind::Inference), None]
    );
    assert_eq!(result.successful_images, 3);
}

#[test]
fn per_image_inference_failure_is_isolated() {
    let scorer = Scorer::with_model(Arc::new(OddWidthModel), ScorerConfig::with_batch_size(8)).unwrap();
    let images = vec![png_image(10, 10), png_image(11, 10), png_image(12, 10)];
    let result = scorer.score_many(&images).unwrap();
    assert!(result.outcomes[0].is_scored());
    assert_eq!(result.outcomes[1].failure().unwrap().kind(), ErrorKind::Inference);
    assert!(result.outcomes[2].is_scored());
    // Raw score 0 calibrates to exactly one half.
    assert_eq!(result.outcomes[0].scored().unwrap().score.value(), 0.5);
}

#[test]
fn cancelled_batch_returns_cancelled() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = scorer(2)
        .score_many_cancellable(&[png_image(16, 16), png_image(20, 20)], &cancel)
        .unwrap_err();
    assert_eq!(err, ScoreError::Cancelled);
}

#[test]
fn cancellation_between_chunks_stops_before_the_next_pass() {
    let cancel = CancelFlag::new();
    let model = Arc::new(CancelsDuringFirstChunk { cancel: cancel.clone(), calls: AtomicUsize::new(0) });
    let scorer = Scorer::with_model(model.clone(), ScorerConfig::with_batch_size(2)).unwrap();
    let images: Vec<RawImage> = (1..=5).map(|i| png_image(8 * i, 8)).collect();

    let err = scorer.score_many_cancellable(&images, &cancel).unwrap_err();
    assert_eq!(err, ScoreError::Cancelled);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn non_finite_network_output_fails_only_that_image() {
    let mut net = network(3);
    let [hidden, last] = &mut net.head[..] else {
        panic!("default head has two layers");
    };
    hidden.weights.iter_mut().for_each(|w| *w = 0.0);
    hidden.biases.iter_mut().for_each(|b| *b = 1.0);
    last.weights.iter_mut().for_each(|w| *w = f32::MAX);
    last.biases.iter_mut().for_each(|b| *b = f32::MAX);
    let scorer = Scorer::with_model(Arc::new(net), ScorerConfig::default()).unwrap();

    let result = scorer.score_many(&[png_image(20, 20), broken_image()]).unwrap();
    let failure = result.outcomes[0].failure().unwrap();
    assert_eq!(failure.kind(), ErrorKind::Inference);
    assert!(failure.error.to_string().contains("non-finite"));
    assert_eq!(result.outcomes[1].failure().unwrap().kind(), ErrorKind::Decode);
}

#[test]
fn tensor_of_the_wrong_resolution_is_an_inference_error() {
    let tensor = normalize(&png_image(20, 20), TEST_INPUT_SIZE / 2).unwrap();
    let err = network(1).forward(&tensor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);

    let per_image = network(1).infer(std::slice::from_ref(&tensor)).unwrap();
    assert!(matches!(per_image[0], Err(ScoreError::Inference(_))));
}

#[test]
fn outcomes_serialize_with_status_tag() {
    let result = scorer(4).score_many(&[png_image(12, 12), broken_image()]).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["outcomes"][0]["status"], "scored");
    assert_eq!(json["outcomes"][1]["status"], "failed");
    assert_eq!(json["outcomes"][1]["kind"], "decode_error");
}

// ---------------------------------------------------------------------------
// Model artifacts
// ---------------------------------------------------------------------------

#[test]
fn saved_model_scores_identically_after_reload() {
    let original = network(42);
    let path = std::env::temp_dir().join(format!("food_aesthetics_model_{}.json", std::process::id()));
    let path = path.to_string_lossy().into_owned();
    original.save_json(&path).unwrap();
    let reloaded = ScoringNetwork::load_json(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(reloaded.input_size, TEST_INPUT_SIZE);
    let images = vec![png_image(50, 25), png_image(25, 50)];
    let a = Scorer::with_model(Arc::new(original), ScorerConfig::default()).unwrap();
    let b = Scorer::with_model(Arc::new(reloaded), ScorerConfig::default()).unwrap();
    let before = a.score_many(&images).unwrap().scores();
    let after = b.score_many(&images).unwrap().scores();
    for (x, y) in before.iter().zip(&after) {
        assert!((x.unwrap() - y.unwrap()).abs() < 1e-6);
    }
}

#[test]
fn missing_model_file_is_model_load_error() {
    let err = ScoringNetwork::load_json("/nonexistent/food_aesthetics.json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);
}

#[test]
fn same_seed_same_weights() {
    let images = vec![png_image(33, 21)];
    let a = Scorer::with_model(Arc::new(network(9)), ScorerConfig::default()).unwrap();
    let b = Scorer::with_model(Arc::new(network(9)), ScorerConfig::default()).unwrap();
    assert_eq!(a.score_many(&images).unwrap().scores(), b.score_many(&images).unwrap().scores());
}
