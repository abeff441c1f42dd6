use crate::types::TreeNode;
use serde::{Deserialize, Serialize};

/// A multitree individual: one expression tree per discrete action, plus the
/// scalar statistics the evolution loop tracks for it.
///
/// Trees own their children (`Box`), so `Clone` produces a deep copy with no
/// shared mutable state — the property elitism and archiving rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Multitree {
    pub trees: Vec<TreeNode>,
    pub fitness: Option<f64>,
    pub wins: u64,
    pub games: u64,
}

impl Multitree {
    pub fn new(trees: Vec<TreeNode>) -> Self {
        Self {
            trees,
            fitness: None,
            wins: 0,
            games: 0,
        }
    }

    /// Number of outputs, one per tree.
    pub fn num_actions(&self) -> usize {
        self.trees.len()
    }

    /// Total node count across all trees.
    pub fn size(&self) -> usize {
        self.trees.iter().map(TreeNode::size).sum()
    }

    /// Fitness, or an error-signaling minimum when not yet evaluated.
    /// Selection must never observe the fallback; it exists so sorting
    /// partially-initialized populations in tests stays total.
    pub fn fitness_or_min(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    /// One output value per action for a single state.
    pub fn outputs(&self, state: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.eval(state)).collect()
    }

    /// Outputs for a batch of states, row per state.
    pub fn outputs_batch(&self, states: &[Vec<f64>]) -> Vec<Vec<f64>> {
        states.iter().map(|s| self.outputs(s)).collect()
    }

    /// Index of the highest-output action for a state.
    pub fn best_action(&self, state: &[f64]) -> usize {
        let outputs = self.outputs(state);
        let mut best = 0;
        for (i, v) in outputs.iter().enumerate() {
            if *v > outputs[best] {
                best = i;
            }
        }
        best
    }

    /// All differentiable coefficients, pre-order within each tree, trees in
    /// order.
    pub fn coefficients(&self) -> Vec<f64> {
        let mut out = Vec::new();
        for tree in &self.trees {
            tree.collect_coefficients(&mut out);
        }
        out
    }

    /// Write back coefficients in the same order `coefficients` reports them.
    pub fn set_coefficients(&mut self, values: &[f64]) {
        let mut iter = values.iter();
        for tree in &mut self.trees {
            tree.assign_coefficients(&mut iter);
        }
    }

    /// Clear fitness and score statistics, as for a freshly built offspring.
    pub fn reset_stats(&mut self) {
        self.fitness = None;
        self.wins = 0;
        self.games = 0;
    }
}

impl std::fmt::Display for Multitree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, tree) in self.trees.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "a{}: {}", i, tree)?;
        }
        Ok(())
    }
}
