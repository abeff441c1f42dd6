use crate::config::SelectionStrategy;
use crate::trees::Multitree;
use rand::Rng;

/// Select `n` parents from the population under the configured strategy.
/// Parents are clones; the live population is untouched.
pub fn select_parents<R: Rng>(
    population: &[Multitree],
    n: usize,
    strategy: SelectionStrategy,
    rng: &mut R,
) -> Vec<Multitree> {
    (0..n)
        .map(|_| match strategy {
            SelectionStrategy::Tournament { size } => {
                tournament_selection(population, size, rng)
            }
            SelectionStrategy::Roulette => roulette_selection(population, rng),
        })
        .collect()
}

/// Tournament selection: pick best of K random candidates
pub fn tournament_selection<R: Rng>(
    population: &[Multitree],
    tournament_size: usize,
    rng: &mut R,
) -> Multitree {
    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_fitness = population[best_idx].fitness_or_min();

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        let fitness = population[idx].fitness_or_min();
        if fitness > best_fitness {
            best_idx = idx;
            best_fitness = fitness;
        }
    }

    population[best_idx].clone()
}

/// Roulette wheel selection: probability proportional to fitness
pub fn roulette_selection<R: Rng>(population: &[Multitree], rng: &mut R) -> Multitree {
    let total_fitness: f64 = population.iter().map(|i| i.fitness_or_min().max(0.0)).sum();

    if total_fitness <= 0.0 {
        // All non-positive fitness, pick random
        return population[rng.gen_range(0..population.len())].clone();
    }

    let mut spin = rng.gen::<f64>() * total_fitness;

    for individual in population {
        spin -= individual.fitness_or_min().max(0.0);
        if spin <= 0.0 {
            return individual.clone();
        }
    }

    // Fallback
    population[population.len() - 1].clone()
}
