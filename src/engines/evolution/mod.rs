pub mod controller;
pub mod elitism;
pub mod operators;
pub mod progress;
pub mod selection;
pub mod variation;

pub use controller::{Evolution, RunState};
pub use progress::{ConsoleProgressCallback, ProgressCallback, SilentProgressCallback};
pub use variation::VariationPipeline;
