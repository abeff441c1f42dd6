pub mod autodiff;
pub mod generator;
pub mod multitree;

pub use autodiff::MultitreeTape;
pub use generator::{random_multitree, random_tree, InternalSymbol, LeafSymbol, Vocabulary};
pub use multitree::Multitree;
