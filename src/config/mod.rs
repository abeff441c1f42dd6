pub mod evolution;
pub mod manager;
pub mod refiner;
pub mod traits;

pub use evolution::{
    CoeffOptDescriptor, CoeffOptKind, CrossoverDescriptor, CrossoverKind, EvolutionConfig,
    MutationDescriptor, MutationKind, SelectionStrategy,
};
pub use manager::{AppConfig, ConfigManager};
pub use refiner::RefinerConfig;
