use crate::engines::evaluation::{Evaluation, FitnessFunction};
use crate::error::{EvotreeError, Result};
use crate::trees::Multitree;
use log::debug;
use rayon::prelude::*;

/// Fans a batch of individuals out to a bounded worker pool and collects one
/// evaluation per individual, in input order.
///
/// The worker count is a performance knob only: evaluations are independent,
/// so results do not depend on scheduling. The first failed evaluation aborts
/// the whole batch.
pub struct ParallelEvaluator {
    pool: rayon::ThreadPool,
    num_evals: u64,
}

impl ParallelEvaluator {
    pub fn new(parallelism: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| {
                EvotreeError::Configuration(format!("Failed to build worker pool: {}", e))
            })?;
        Ok(Self { pool, num_evals: 0 })
    }

    /// Total individuals evaluated so far; the termination policy reads this.
    pub fn num_evals(&self) -> u64 {
        self.num_evals
    }

    /// Evaluate every individual exactly once. Output index i corresponds to
    /// input index i.
    pub fn evaluate_batch<F: FitnessFunction>(
        &mut self,
        individuals: &[Multitree],
        fitness: &F,
    ) -> Result<Vec<Evaluation>> {
        if individuals.is_empty() {
            return Ok(Vec::new());
        }
        let results: Result<Vec<Evaluation>> = self.pool.install(|| {
            individuals
                .par_iter()
                .map(|individual| fitness.evaluate(individual))
                .collect()
        });
        let results = results?;
        self.num_evals += individuals.len() as u64;
        debug!(
            "evaluated batch of {} ({} evaluations total)",
            individuals.len(),
            self.num_evals
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::Multitree;
    use crate::types::TreeNode;

    /// Deterministic fitness: the value of the first tree at a fixed state.
    struct EvalAtOne;

    impl FitnessFunction for EvalAtOne {
        fn evaluate(&self, individual: &Multitree) -> Result<Evaluation> {
            Ok(Evaluation {
                fitness: individual.trees[0].eval(&[1.0]),
                transitions: Vec::new(),
                wins: 0,
                games: 1,
            })
        }
    }

    struct AlwaysFails;

    impl FitnessFunction for AlwaysFails {
        fn evaluate(&self, _individual: &Multitree) -> Result<Evaluation> {
            Err(EvotreeError::Evaluation("boom".to_string()))
        }
    }

    fn constant_individual(c: f64) -> Multitree {
        Multitree::new(vec![TreeNode::Const(c)])
    }

    #[test]
    fn test_results_align_with_input_order() {
        let mut evaluator = ParallelEvaluator::new(4).unwrap();
        let batch: Vec<Multitree> = (0..32).map(|i| constant_individual(i as f64)).collect();
        let results = evaluator.evaluate_batch(&batch, &EvalAtOne).unwrap();
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.fitness, i as f64);
        }
    }

    #[test]
    fn test_counter_tracks_batch_sizes() {
        let mut evaluator = ParallelEvaluator::new(2).unwrap();
        let batch: Vec<Multitree> = (0..5).map(|i| constant_individual(i as f64)).collect();
        evaluator.evaluate_batch(&batch, &EvalAtOne).unwrap();
        evaluator.evaluate_batch(&batch[..3], &EvalAtOne).unwrap();
        assert_eq!(evaluator.num_evals(), 8);
    }

    #[test]
    fn test_repeated_evaluation_is_identical() {
        let mut evaluator = ParallelEvaluator::new(3).unwrap();
        let batch: Vec<Multitree> = (0..16).map(|i| constant_individual(i as f64 * 0.5)).collect();
        let a = evaluator.evaluate_batch(&batch, &EvalAtOne).unwrap();
        let b = evaluator.evaluate_batch(&batch, &EvalAtOne).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.fitness, y.fitness);
        }
    }

    #[test]
    fn test_failure_propagates() {
        let mut evaluator = ParallelEvaluator::new(2).unwrap();
        let batch = vec![constant_individual(0.0)];
        assert!(evaluator.evaluate_batch(&batch, &AlwaysFails).is_err());
    }
}
