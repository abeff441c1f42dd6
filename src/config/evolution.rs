use super::traits::ConfigSection;
use crate::error::EvotreeError;
use serde::{Deserialize, Serialize};

/// Crossover operators understood by the variation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    /// Graft a random subtree from a donor parent.
    Subtree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossoverDescriptor {
    pub kind: CrossoverKind,
    pub rate: f64,
}

/// Mutation operators understood by the variation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Replace a random subtree with a freshly grown one.
    Subtree { max_depth: usize },
    /// Resample individual symbols in place, arity preserved.
    Point { prob: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationDescriptor {
    pub kind: MutationKind,
    pub rate: f64,
}

/// Coefficient-optimization operators understood by the variation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoeffOptKind {
    /// Perturb each coefficient with probability `prob` by Gaussian noise
    /// scaled to `temp` times the coefficient magnitude.
    Gaussian { prob: f64, temp: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoeffOptDescriptor {
    pub kind: CoeffOptKind,
    pub rate: f64,
}

/// Parent-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    Tournament { size: usize },
    Roulette,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub pop_size: usize,
    pub num_trees: usize,
    pub init_max_depth: usize,
    pub max_tree_size: usize,
    pub crossovers: Vec<CrossoverDescriptor>,
    pub mutations: Vec<MutationDescriptor>,
    pub coeff_opts: Vec<CoeffOptDescriptor>,
    pub selection: SelectionStrategy,
    /// Fraction of the population preserved as elites, in [0, 1].
    pub elitism: f64,
    pub max_evals: Option<u64>,
    pub max_gens: Option<u64>,
    pub max_time_secs: Option<u64>,
    pub parallelism: usize,
    pub verbose: bool,
    pub seed: Option<u64>,
    /// Best-fitness threshold above which the run asks the fitness function
    /// for a harder evaluation setup. Off when unset.
    pub harder_best_threshold: Option<f64>,
    /// Mean-fitness threshold paired with `harder_best_threshold`; both must
    /// be exceeded for the signal to fire.
    pub harder_mean_threshold: Option<f64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            pop_size: 256,
            num_trees: 2,
            init_max_depth: 4,
            max_tree_size: 64,
            crossovers: vec![CrossoverDescriptor {
                kind: CrossoverKind::Subtree,
                rate: 0.5,
            }],
            mutations: vec![MutationDescriptor {
                kind: MutationKind::Subtree { max_depth: 4 },
                rate: 0.5,
            }],
            coeff_opts: vec![CoeffOptDescriptor {
                kind: CoeffOptKind::Gaussian {
                    prob: 0.25,
                    temp: 0.25,
                },
                rate: 0.5,
            }],
            selection: SelectionStrategy::Tournament { size: 8 },
            elitism: 0.1,
            max_evals: None,
            max_gens: Some(100),
            max_time_secs: None,
            parallelism: 4,
            verbose: false,
            seed: None,
            harder_best_threshold: None,
            harder_mean_threshold: None,
        }
    }
}

fn check_rate(section: &str, what: &str, rate: f64) -> Result<(), EvotreeError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(EvotreeError::Configuration(format!(
            "{}: {} rate must be between 0 and 1, got {}",
            section, what, rate
        )));
    }
    Ok(())
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EvotreeError> {
        if self.pop_size < 2 {
            return Err(EvotreeError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.num_trees == 0 {
            return Err(EvotreeError::Configuration(
                "Individuals need at least one tree".to_string(),
            ));
        }
        if self.max_tree_size == 0 {
            return Err(EvotreeError::Configuration(
                "max_tree_size must be at least 1".to_string(),
            ));
        }
        if self.parallelism == 0 {
            return Err(EvotreeError::Configuration(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.elitism) {
            return Err(EvotreeError::Configuration(
                "elitism must be between 0 and 1".to_string(),
            ));
        }
        for c in &self.crossovers {
            check_rate("crossovers", "crossover", c.rate)?;
        }
        for m in &self.mutations {
            check_rate("mutations", "mutation", m.rate)?;
            if let MutationKind::Point { prob } = m.kind {
                check_rate("mutations", "point-mutation per-node", prob)?;
            }
        }
        for c in &self.coeff_opts {
            check_rate("coeff_opts", "coefficient-optimization", c.rate)?;
            let CoeffOptKind::Gaussian { prob, temp } = c.kind;
            check_rate("coeff_opts", "per-coefficient", prob)?;
            if temp < 0.0 {
                return Err(EvotreeError::Configuration(
                    "coefficient-mutation temperature must be non-negative".to_string(),
                ));
            }
        }
        if let SelectionStrategy::Tournament { size } = self.selection {
            if size == 0 {
                return Err(EvotreeError::Configuration(
                    "tournament size must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_rate_rejected() {
        let mut cfg = EvolutionConfig::default();
        cfg.crossovers[0].rate = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_elitism_rejected() {
        let cfg = EvolutionConfig {
            elitism: -0.1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let cfg = EvolutionConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: EvolutionConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.pop_size, cfg.pop_size);
        assert_eq!(back.crossovers.len(), 1);
        assert_eq!(back.selection, SelectionStrategy::Tournament { size: 8 });
    }
}
