use crate::error::Result;
use crate::trees::Multitree;
use crate::types::Transition;

/// Everything one fitness invocation reports back for one individual.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub fitness: f64,
    /// Interaction transitions collected while scoring, fed to replay memory.
    pub transitions: Vec<Transition>,
    pub wins: u64,
    pub games: u64,
}

/// The fitness collaborator. Implementations are invoked concurrently across
/// individuals and must not share mutable state between calls in a way that
/// changes results.
pub trait FitnessFunction: Send + Sync {
    fn evaluate(&self, individual: &Multitree) -> Result<Evaluation>;

    /// Called when both the best and mean fitness exceed their configured
    /// thresholds; implementations may switch to a harder evaluation setup.
    fn raise_difficulty(&self) {}
}
