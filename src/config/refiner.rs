use super::traits::ConfigSection;
use crate::error::EvotreeError;
use serde::{Deserialize, Serialize};

/// Hyperparameters for the gradient refinement pass applied to the initial
/// champion's coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinerConfig {
    /// Number of optimization iterations.
    pub iterations: usize,
    /// Minibatch size sampled from replay memory per iteration. Refinement
    /// is skipped unless the memory holds strictly more transitions.
    pub batch_size: usize,
    /// Discount applied to the target value of non-terminal transitions.
    pub discount: f64,
    pub learning_rate: f64,
    /// Per-component gradient magnitude bound.
    pub grad_clip: f64,
    pub weight_decay: f64,
    /// Ring-buffer capacity of the replay memory.
    pub replay_capacity: usize,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            batch_size: 128,
            discount: 0.99,
            learning_rate: 1e-3,
            grad_clip: 100.0,
            weight_decay: 0.01,
            replay_capacity: 100_000,
        }
    }
}

impl ConfigSection for RefinerConfig {
    fn section_name() -> &'static str {
        "refiner"
    }

    fn validate(&self) -> Result<(), EvotreeError> {
        if self.batch_size == 0 {
            return Err(EvotreeError::Configuration(
                "refiner batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(EvotreeError::Configuration(
                "refiner discount must be between 0 and 1".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(EvotreeError::Configuration(
                "refiner learning_rate must be positive".to_string(),
            ));
        }
        if self.grad_clip <= 0.0 {
            return Err(EvotreeError::Configuration(
                "refiner grad_clip must be positive".to_string(),
            ));
        }
        if self.weight_decay < 0.0 {
            return Err(EvotreeError::Configuration(
                "refiner weight_decay must be non-negative".to_string(),
            ));
        }
        if self.replay_capacity < self.batch_size {
            return Err(EvotreeError::Configuration(
                "replay_capacity must be at least batch_size".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RefinerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_capacity_below_batch_rejected() {
        let cfg = RefinerConfig {
            replay_capacity: 10,
            batch_size: 64,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
