use crate::trees::Multitree;

/// Per-generation fitness and score statistics for the diagnostic report.
///
/// Degenerate populations (uniform fitness, fewer than two members) produce
/// zero spread statistics rather than an error.
#[derive(Debug, Clone, Default)]
pub struct GenerationStats {
    pub best: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Mean wins/games ratio across the population; individuals with no
    /// recorded games contribute zero.
    pub mean_win_rate: f64,
}

impl GenerationStats {
    pub fn compute(population: &[Multitree]) -> Self {
        let fitnesses: Vec<f64> = population.iter().map(|i| i.fitness_or_min()).collect();
        if fitnesses.is_empty() {
            return Self::default();
        }

        let n = fitnesses.len() as f64;
        let mean = fitnesses.iter().sum::<f64>() / n;
        let min = fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let max = fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let variance = if fitnesses.len() < 2 {
            0.0
        } else {
            fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1.0)
        };

        let mut sorted = fitnesses.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let mean_win_rate = population
            .iter()
            .map(|i| {
                if i.games == 0 {
                    0.0
                } else {
                    i.wins as f64 / i.games as f64
                }
            })
            .sum::<f64>()
            / n;

        Self {
            best: max,
            mean,
            min,
            max,
            median,
            variance,
            std_dev: variance.sqrt(),
            mean_win_rate,
        }
    }
}

impl std::fmt::Display for GenerationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "best: {:.3}, mean: {:.3}, min: {:.3}, max: {:.3}, median: {:.3}, \
             variance: {:.3}, std dev: {:.3}, win rate: {:.3}",
            self.best,
            self.mean,
            self.min,
            self.max,
            self.median,
            self.variance,
            self.std_dev,
            self.mean_win_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeNode;

    fn individual(fitness: f64, wins: u64, games: u64) -> Multitree {
        let mut ind = Multitree::new(vec![TreeNode::Const(0.0)]);
        ind.fitness = Some(fitness);
        ind.wins = wins;
        ind.games = games;
        ind
    }

    #[test]
    fn test_basic_statistics() {
        let pop = vec![
            individual(1.0, 1, 2),
            individual(2.0, 0, 2),
            individual(3.0, 2, 2),
            individual(4.0, 1, 1),
        ];
        let stats = GenerationStats::compute(&pop);
        assert_eq!(stats.best, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.5);
        // sample variance of 1..4
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
        assert!((stats.mean_win_rate - (0.5 + 0.0 + 1.0 + 1.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_fitness_is_not_an_error() {
        let pop = vec![individual(2.0, 0, 0); 5];
        let stats = GenerationStats::compute(&pop);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean_win_rate, 0.0);
    }

    #[test]
    fn test_single_member_population() {
        let pop = vec![individual(1.5, 1, 1)];
        let stats = GenerationStats::compute(&pop);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.median, 1.5);
    }

    #[test]
    fn test_empty_population() {
        let stats = GenerationStats::compute(&[]);
        assert_eq!(stats.mean, 0.0);
    }
}
