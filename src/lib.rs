pub mod config;
pub mod engines;
pub mod error;
pub mod trees;
pub mod types;

pub use config::{AppConfig, ConfigManager, EvolutionConfig, RefinerConfig};
pub use engines::evaluation::{Evaluation, FitnessFunction, ParallelEvaluator};
pub use engines::evolution::{Evolution, ProgressCallback, RunState};
pub use engines::metrics::GenerationStats;
pub use engines::refinement::{GradientRefiner, ReplayMemory};
pub use error::{EvotreeError, Result};
pub use trees::{Multitree, Vocabulary};
pub use types::{Transition, TreeNode};
