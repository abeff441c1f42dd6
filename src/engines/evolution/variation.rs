use crate::config::{
    CoeffOptDescriptor, CoeffOptKind, CrossoverDescriptor, CrossoverKind, MutationDescriptor,
    MutationKind,
};
use crate::engines::evolution::operators::{
    coeff_mutation, point_mutation, subtree_crossover, subtree_mutation,
};
use crate::trees::{Multitree, Vocabulary};
use rand::Rng;

/// Applies the configured crossover, mutation, and coefficient-optimization
/// operators to produce one offspring per parent.
///
/// Every operator application is checked against `max_tree_size`: a product
/// whose trees would exceed the bound is discarded and the offspring keeps
/// its pre-operator form, so the final offspring never violates the
/// constraint.
pub struct VariationPipeline {
    crossovers: Vec<CrossoverDescriptor>,
    mutations: Vec<MutationDescriptor>,
    coeff_opts: Vec<CoeffOptDescriptor>,
    vocabulary: Vocabulary,
    max_tree_size: usize,
}

impl VariationPipeline {
    pub fn new(
        crossovers: Vec<CrossoverDescriptor>,
        mutations: Vec<MutationDescriptor>,
        coeff_opts: Vec<CoeffOptDescriptor>,
        vocabulary: Vocabulary,
        max_tree_size: usize,
    ) -> Self {
        Self {
            crossovers,
            mutations,
            coeff_opts,
            vocabulary,
            max_tree_size,
        }
    }

    fn within_bound(&self, individual: &Multitree) -> bool {
        individual.trees.iter().all(|t| t.size() <= self.max_tree_size)
    }

    /// Candidate replaces the current offspring only when it stays within
    /// the size bound.
    fn accept(&self, current: Multitree, candidate: Multitree) -> Multitree {
        if self.within_bound(&candidate) {
            candidate
        } else {
            current
        }
    }

    /// Produce one offspring from `parent`, drawing crossover donors from
    /// `pool`. The offspring starts as a deep copy of the parent with its
    /// statistics cleared.
    pub fn offspring<R: Rng>(
        &self,
        parent: &Multitree,
        pool: &[Multitree],
        rng: &mut R,
    ) -> Multitree {
        let mut child = parent.clone();
        child.reset_stats();

        for descriptor in &self.crossovers {
            if !pool.is_empty() && rng.gen_bool(descriptor.rate) {
                let donor = &pool[rng.gen_range(0..pool.len())];
                let candidate = match descriptor.kind {
                    CrossoverKind::Subtree => subtree_crossover(&child, donor, rng),
                };
                child = self.accept(child, candidate);
            }
        }

        for descriptor in &self.mutations {
            if rng.gen_bool(descriptor.rate) {
                let candidate = match descriptor.kind {
                    MutationKind::Subtree { max_depth } => {
                        subtree_mutation(&child, &self.vocabulary, max_depth, rng)
                    }
                    MutationKind::Point { prob } => {
                        point_mutation(&child, &self.vocabulary, prob, rng)
                    }
                };
                child = self.accept(child, candidate);
            }
        }

        for descriptor in &self.coeff_opts {
            if rng.gen_bool(descriptor.rate) {
                let CoeffOptKind::Gaussian { prob, temp } = descriptor.kind;
                // Coefficient updates never change tree shape
                child = coeff_mutation(&child, prob, temp, rng);
            }
        }

        child
    }
}
