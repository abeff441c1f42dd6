pub mod fitness;
pub mod parallel;

pub use fitness::{Evaluation, FitnessFunction};
pub use parallel::ParallelEvaluator;
