use crate::config::RefinerConfig;
use crate::engines::refinement::{AdamW, ReplayMemory};
use crate::trees::{Multitree, MultitreeTape};
use log::{debug, info};
use rand::Rng;

/// Gradient-based local search over the champion's embedded coefficients,
/// driven by replayed transitions instead of the fitness function.
///
/// Each iteration freezes the current coefficients as the target snapshot,
/// samples a minibatch, regresses predicted action values onto
/// `reward + discount * max_a target(next_state)` under a Huber loss, clips
/// the coefficient gradients, and applies one AdamW step. Only the champion
/// is mutated, and only its coefficients.
pub struct GradientRefiner {
    config: RefinerConfig,
}

impl GradientRefiner {
    pub fn new(config: RefinerConfig) -> Self {
        Self { config }
    }

    /// Refine `champion` in place. Returns false (leaving the champion
    /// untouched) when there is nothing to optimize: no coefficients, or not
    /// enough replay data to fill a minibatch.
    pub fn refine<R: Rng>(
        &self,
        champion: &mut Multitree,
        replay: &ReplayMemory,
        rng: &mut R,
    ) -> bool {
        let tape = MultitreeTape::compile(champion);
        if tape.num_coefficients() == 0 {
            debug!("refinement skipped: champion has no coefficients");
            return false;
        }
        if replay.len() <= self.config.batch_size {
            debug!(
                "refinement skipped: {} transitions <= batch size {}",
                replay.len(),
                self.config.batch_size
            );
            return false;
        }

        let num_actions = champion.num_actions();
        let mut coeffs = champion.coefficients();
        let mut optimizer = AdamW::new(
            coeffs.len(),
            self.config.learning_rate,
            self.config.weight_decay,
        );
        let batch_size = self.config.batch_size;
        let mut last_loss = 0.0;

        for iteration in 0..self.config.iterations {
            // Frozen coefficients for this iteration's targets
            let target_coeffs = coeffs.clone();
            let batch = replay.sample(rng, batch_size);

            let mut grads = vec![0.0; coeffs.len()];
            let mut loss = 0.0;

            for transition in &batch {
                if transition.action >= num_actions {
                    continue;
                }
                let action_tape = tape.tape(transition.action);
                let values = action_tape.forward(&transition.state, &coeffs);
                let predicted = action_tape.output(&values);

                let next_value = match &transition.next_state {
                    Some(next) => (0..num_actions)
                        .map(|a| tape.value(a, next, &target_coeffs))
                        .fold(f64::NEG_INFINITY, f64::max),
                    None => 0.0,
                };
                let target = transition.reward + self.config.discount * next_value;

                let diff = predicted - target;
                if !diff.is_finite() {
                    continue;
                }
                // Huber with beta = 1, mean reduction over the minibatch
                loss += if diff.abs() < 1.0 {
                    0.5 * diff * diff
                } else {
                    diff.abs() - 0.5
                };
                let dpred = diff.clamp(-1.0, 1.0) / batch_size as f64;
                action_tape.backward(&values, dpred, &mut grads);
            }

            for g in &mut grads {
                if !g.is_finite() {
                    *g = 0.0;
                }
                *g = g.clamp(-self.config.grad_clip, self.config.grad_clip);
            }
            optimizer.step(&mut coeffs, &grads);

            last_loss = loss / batch_size as f64;
            if iteration % 100 == 0 {
                debug!("refinement iteration {}: loss {:.6}", iteration, last_loss);
            }
        }

        champion.set_coefficients(&coeffs);
        info!(
            "refined {} coefficients over {} iterations (final loss {:.6})",
            coeffs.len(),
            self.config.iterations,
            last_loss
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BinaryOp, Transition, TreeNode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn linear_individual(c: f64) -> Multitree {
        // one action: c * x0
        Multitree::new(vec![TreeNode::Binary {
            op: BinaryOp::Mul,
            left: Box::new(TreeNode::Const(c)),
            right: Box::new(TreeNode::Feature(0)),
        }])
    }

    fn terminal(state: f64, reward: f64) -> Transition {
        Transition {
            state: vec![state],
            action: 0,
            next_state: None,
            reward,
        }
    }

    fn small_config(iterations: usize, batch_size: usize) -> RefinerConfig {
        RefinerConfig {
            iterations,
            batch_size,
            learning_rate: 0.05,
            ..Default::default()
        }
    }

    #[test]
    fn test_skips_without_enough_replay() {
        let mut champion = linear_individual(0.5);
        let before = champion.coefficients();
        let mut replay = ReplayMemory::new(100);
        for i in 0..8 {
            replay.push(terminal(i as f64, 1.0));
        }
        let refiner = GradientRefiner::new(small_config(50, 8));
        let changed = refiner.refine(&mut champion, &replay, &mut StdRng::seed_from_u64(1));
        assert!(!changed);
        assert_eq!(champion.coefficients(), before);
    }

    #[test]
    fn test_skips_without_coefficients() {
        let mut champion = Multitree::new(vec![TreeNode::Feature(0)]);
        let mut replay = ReplayMemory::new(100);
        for i in 0..32 {
            replay.push(terminal(i as f64, 1.0));
        }
        let refiner = GradientRefiner::new(small_config(50, 8));
        let changed = refiner.refine(&mut champion, &replay, &mut StdRng::seed_from_u64(1));
        assert!(!changed);
    }

    #[test]
    fn test_fits_terminal_rewards() {
        // Terminal transitions with reward = 2 * state make the optimal
        // coefficient for c * x0 equal to 2.
        let mut champion = linear_individual(0.1);
        let mut replay = ReplayMemory::new(1000);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let s: f64 = rng.gen_range(0.5..1.5);
            replay.push(terminal(s, 2.0 * s));
        }
        let refiner = GradientRefiner::new(small_config(800, 32));
        let changed = refiner.refine(&mut champion, &replay, &mut rng);
        assert!(changed);
        let c = champion.coefficients()[0];
        assert!((c - 2.0).abs() < 0.2, "coefficient converged to {}", c);
    }
}
