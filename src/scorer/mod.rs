pub mod batch;
pub mod cancel;
pub mod orchestrator;

pub use batch::{BatchResult, Failure, ImageOutcome, ScoredImage};
pub use cancel::CancelFlag;
pub use orchestrator::Scorer;
