//! Speech synthesis requests and outcome classification

mod coordinator;

pub use coordinator::{classify, SynthesisCoordinator, SynthesisError, SynthesisOutcome};
