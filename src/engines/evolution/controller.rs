use crate::config::{AppConfig, EvolutionConfig};
use crate::engines::evaluation::{FitnessFunction, ParallelEvaluator};
use crate::engines::evolution::elitism;
use crate::engines::evolution::progress::{ProgressCallback, SilentProgressCallback};
use crate::engines::evolution::selection::select_parents;
use crate::engines::evolution::variation::VariationPipeline;
use crate::engines::metrics::GenerationStats;
use crate::engines::refinement::{GradientRefiner, ReplayMemory};
use crate::error::{EvotreeError, Result};
use crate::trees::{random_multitree, Multitree, Vocabulary};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Initializing,
    Generating,
    Terminated,
}

/// Owns the generational loop: initialization, selection, variation,
/// evaluation, elitism, replay aggregation, the one-shot gradient
/// refinement, termination, and reporting. All run state (counters, RNG,
/// archive) lives on this struct; nothing is process-global, so independent
/// runs can coexist.
pub struct Evolution<F: FitnessFunction> {
    config: EvolutionConfig,
    fitness: F,
    vocabulary: Vocabulary,
    pipeline: VariationPipeline,
    evaluator: ParallelEvaluator,
    refiner: GradientRefiner,
    replay: ReplayMemory,
    population: Vec<Multitree>,
    best_of_gens: Vec<Multitree>,
    num_gens: u64,
    start_time: Option<Instant>,
    state: RunState,
    rng: StdRng,
}

impl<F: FitnessFunction> Evolution<F> {
    pub fn new(config: AppConfig, vocabulary: Vocabulary, fitness: F) -> Result<Self> {
        config.validate()?;
        if vocabulary.is_empty() {
            return Err(EvotreeError::Configuration(
                "vocabulary needs at least one internal and one leaf symbol".to_string(),
            ));
        }

        let evaluator = ParallelEvaluator::new(config.evolution.parallelism)?;
        let rng = match config.evolution.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pipeline = VariationPipeline::new(
            config.evolution.crossovers.clone(),
            config.evolution.mutations.clone(),
            config.evolution.coeff_opts.clone(),
            vocabulary.clone(),
            config.evolution.max_tree_size,
        );
        let replay = ReplayMemory::new(config.refiner.replay_capacity);
        let refiner = GradientRefiner::new(config.refiner);

        Ok(Self {
            config: config.evolution,
            fitness,
            vocabulary,
            pipeline,
            evaluator,
            refiner,
            replay,
            population: Vec::new(),
            best_of_gens: Vec::new(),
            num_gens: 0,
            start_time: None,
            state: RunState::Uninitialized,
            rng,
        })
    }

    /// Supply an already-evaluated population instead of random
    /// initialization. Seeded runs skip initialization entirely, including
    /// the gradient refinement pass, so every member must carry a fitness.
    pub fn set_seed_population(&mut self, population: Vec<Multitree>) -> Result<()> {
        if population.len() != self.config.pop_size {
            return Err(EvotreeError::Configuration(format!(
                "seed population has {} members, pop_size is {}",
                population.len(),
                self.config.pop_size
            )));
        }
        if population.iter().any(|i| i.fitness.is_none()) {
            return Err(EvotreeError::Configuration(
                "seed population members must be evaluated (fitness set)".to_string(),
            ));
        }
        self.population = population;
        Ok(())
    }

    /// Run the evolution until a termination bound trips.
    pub fn evolve(&mut self) -> Result<()> {
        self.evolve_with(&mut SilentProgressCallback)
    }

    pub fn evolve_with<C: ProgressCallback>(&mut self, callback: &mut C) -> Result<()> {
        if self.state == RunState::Terminated {
            return Err(EvotreeError::Generation(
                "run already terminated; start a new one".to_string(),
            ));
        }
        self.start_time = Some(Instant::now());
        info!(
            "evolution run started at {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        if self.population.is_empty() {
            self.state = RunState::Initializing;
            self.initialize()?;
        } else if self.best_of_gens.is_empty() {
            // Seeded population: archive its champion as the entry for the
            // initial population
            let best = self.population[self.best_index()?].clone();
            self.best_of_gens.push(best);
        }

        self.state = RunState::Generating;
        while !self.must_terminate() {
            self.perform_generation(callback)?;
        }
        self.state = RunState::Terminated;

        info!(
            "evolution terminated after {} generations, {} evaluations, {:.1}s",
            self.num_gens,
            self.evaluator.num_evals(),
            self.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        info!(
            "initializing population of {} ({} trees per individual)",
            self.config.pop_size, self.config.num_trees
        );
        let mut population: Vec<Multitree> = (0..self.config.pop_size)
            .map(|_| {
                random_multitree(
                    self.config.num_trees,
                    &self.vocabulary,
                    self.config.init_max_depth,
                    &mut self.rng,
                )
            })
            .collect();

        let results = self.evaluator.evaluate_batch(&population, &self.fitness)?;
        for (individual, evaluation) in population.iter_mut().zip(results) {
            individual.fitness = Some(evaluation.fitness);
            individual.wins += evaluation.wins;
            individual.games += evaluation.games;
            self.replay.absorb(evaluation.transitions);
        }
        self.population = population;

        let best_idx = self.best_index()?;
        self.refiner
            .refine(&mut self.population[best_idx], &self.replay, &mut self.rng);
        self.best_of_gens.push(self.population[best_idx].clone());
        Ok(())
    }

    fn perform_generation<C: ProgressCallback>(&mut self, callback: &mut C) -> Result<()> {
        callback.on_generation_start(self.num_gens + 1);
        self.maybe_raise_difficulty();

        let parents = select_parents(
            &self.population,
            self.config.pop_size,
            self.config.selection,
            &mut self.rng,
        );

        let n_elites = elitism::elite_count(self.config.elitism, self.config.pop_size);
        let mut elites = elitism::snapshot_elites(&self.population, n_elites);

        let mut offspring: Vec<Multitree> = parents
            .iter()
            .map(|parent| self.pipeline.offspring(parent, &parents, &mut self.rng))
            .collect();

        // Elites are rescored so a drifting fitness function keeps them
        // comparable to the offspring; their score tallies accumulate.
        let elite_results = self.evaluator.evaluate_batch(&elites, &self.fitness)?;
        for (elite, evaluation) in elites.iter_mut().zip(elite_results) {
            elite.fitness = Some(evaluation.fitness);
            elite.wins += evaluation.wins;
            elite.games += evaluation.games;
            self.replay.absorb(evaluation.transitions);
        }

        let offspring_results = self.evaluator.evaluate_batch(&offspring, &self.fitness)?;
        for (child, evaluation) in offspring.iter_mut().zip(offspring_results) {
            child.fitness = Some(evaluation.fitness);
            child.wins += evaluation.wins;
            child.games += evaluation.games;
            self.replay.absorb(evaluation.transitions);
        }

        self.population = offspring;
        elitism::replace(&mut self.population, &elites, self.best_of_gens.last());

        self.num_gens += 1;
        let best = self.population[self.best_index()?].clone();
        let stats = GenerationStats::compute(&self.population);
        if self.config.verbose {
            info!(
                "gen {}: best of gen fitness {:.3}, size {}, scores {}/{}",
                self.num_gens,
                best.fitness_or_min(),
                best.size(),
                best.wins,
                best.games
            );
            info!("gen {}: {}", self.num_gens, stats);
        }
        self.best_of_gens.push(best);
        callback.on_generation_complete(self.num_gens, &stats);
        Ok(())
    }

    fn maybe_raise_difficulty(&self) {
        let (Some(best_threshold), Some(mean_threshold)) = (
            self.config.harder_best_threshold,
            self.config.harder_mean_threshold,
        ) else {
            return;
        };
        let stats = GenerationStats::compute(&self.population);
        if stats.best > best_threshold && stats.mean > mean_threshold {
            info!(
                "fitness thresholds exceeded (best {:.3}, mean {:.3}); requesting harder evaluation",
                stats.best, stats.mean
            );
            self.fitness.raise_difficulty();
        }
    }

    fn must_terminate(&self) -> bool {
        if let Some(max_secs) = self.config.max_time_secs {
            if self.elapsed() >= Duration::from_secs(max_secs) {
                return true;
            }
        }
        if let Some(max_evals) = self.config.max_evals {
            if self.evaluator.num_evals() >= max_evals {
                return true;
            }
        }
        if let Some(max_gens) = self.config.max_gens {
            if self.num_gens >= max_gens {
                return true;
            }
        }
        false
    }

    fn best_index(&self) -> Result<usize> {
        self.population
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.fitness_or_min().total_cmp(&b.fitness_or_min()))
            .map(|(i, _)| i)
            .ok_or_else(|| EvotreeError::Generation("population is empty".to_string()))
    }

    pub fn population(&self) -> &[Multitree] {
        &self.population
    }

    /// Champion archive: index 0 is the best at initialization, then one
    /// entry per completed generation.
    pub fn best_of_gens(&self) -> &[Multitree] {
        &self.best_of_gens
    }

    /// The best individual found so far.
    pub fn best(&self) -> Option<&Multitree> {
        self.best_of_gens.last()
    }

    pub fn num_gens(&self) -> u64 {
        self.num_gens
    }

    pub fn num_evals(&self) -> u64 {
        self.evaluator.num_evals()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }
}
