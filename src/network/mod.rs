pub mod metadata;
pub mod model;
pub mod network;
pub mod spec;

pub use metadata::ModelMetadata;
pub use model::{ModelSlot, ScoringModel};
pub use network::ScoringNetwork;
pub use spec::{ConvSpec, DenseSpec, NetworkSpec};
