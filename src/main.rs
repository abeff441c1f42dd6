use anyhow::Result;
use evotree::config::{AppConfig, SelectionStrategy};
use evotree::engines::evolution::ConsoleProgressCallback;
use evotree::{Evaluation, Evolution, FitnessFunction, Multitree, Transition, Vocabulary};
use std::sync::atomic::{AtomicBool, Ordering};

/// Line-world: the agent starts somewhere on a short track and must reach
/// the goal at the right end. Two actions (left, right), a step penalty, and
/// a goal reward. The policy is greedy over the individual's tree outputs,
/// so a deterministic individual always earns the same score.
struct LineWorld {
    length: usize,
    max_steps: usize,
    hard_mode: AtomicBool,
}

impl LineWorld {
    fn new(length: usize, max_steps: usize) -> Self {
        Self {
            length,
            max_steps,
            hard_mode: AtomicBool::new(false),
        }
    }

    fn state(&self, pos: usize) -> Vec<f64> {
        let span = (self.length - 1) as f64;
        vec![pos as f64 / span, (self.length - 1 - pos) as f64 / span]
    }

    /// Play one episode from `start`; returns (total reward, reached goal,
    /// transitions).
    fn episode(&self, individual: &Multitree, start: usize) -> (f64, bool, Vec<Transition>) {
        let goal = self.length - 1;
        let step_budget = if self.hard_mode.load(Ordering::Relaxed) {
            self.max_steps / 2
        } else {
            self.max_steps
        };

        let mut pos = start;
        let mut total = 0.0;
        let mut transitions = Vec::new();

        for _ in 0..step_budget {
            let state = self.state(pos);
            let action = individual.best_action(&state);
            pos = match action {
                0 => pos.saturating_sub(1),
                _ => (pos + 1).min(goal),
            };
            let reached = pos == goal;
            let reward = if reached { 1.0 } else { -0.05 };
            total += reward;
            transitions.push(Transition {
                state,
                action,
                next_state: if reached { None } else { Some(self.state(pos)) },
                reward,
            });
            if reached {
                return (total, true, transitions);
            }
        }
        (total, false, transitions)
    }
}

impl FitnessFunction for LineWorld {
    fn evaluate(&self, individual: &Multitree) -> evotree::Result<Evaluation> {
        let mut fitness = 0.0;
        let mut wins = 0;
        let mut transitions = Vec::new();
        let starts = [0, self.length / 3, self.length / 2];
        for &start in &starts {
            let (reward, won, mut steps) = self.episode(individual, start);
            fitness += reward;
            wins += u64::from(won);
            transitions.append(&mut steps);
        }
        Ok(Evaluation {
            fitness,
            transitions,
            wins,
            games: starts.len() as u64,
        })
    }

    fn raise_difficulty(&self) {
        self.hard_mode.store(true, Ordering::Relaxed);
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut config = AppConfig::default();
    config.evolution.pop_size = 64;
    config.evolution.num_trees = 2;
    config.evolution.init_max_depth = 3;
    config.evolution.max_tree_size = 32;
    config.evolution.max_gens = Some(20);
    config.evolution.selection = SelectionStrategy::Tournament { size: 4 };
    config.evolution.parallelism = 4;
    config.evolution.verbose = true;
    config.evolution.seed = Some(42);
    config.evolution.harder_best_threshold = Some(2.5);
    config.evolution.harder_mean_threshold = Some(1.5);
    config.refiner.batch_size = 32;
    config.refiner.iterations = 200;

    let world = LineWorld::new(8, 24);
    let mut evolution = Evolution::new(config, Vocabulary::arithmetic(2), world)?;
    evolution.evolve_with(&mut ConsoleProgressCallback)?;

    if let Some(best) = evolution.best() {
        println!(
            "champion after {} generations ({} evaluations): fitness {:.3}, {}/{} wins",
            evolution.num_gens(),
            evolution.num_evals(),
            best.fitness_or_min(),
            best.wins,
            best.games
        );
        println!("{}", best);
    }
    Ok(())
}
