use crate::trees::{random_tree, Multitree, Vocabulary};
use crate::types::TreeNode;
use rand::Rng;

/// Standard normal via Box-Muller; rand's core distributions stop at
/// uniforms.
pub(crate) fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Swap a random subtree of one of the parent's trees with a random subtree
/// taken from the donor's corresponding tree.
pub fn subtree_crossover<R: Rng>(parent: &Multitree, donor: &Multitree, rng: &mut R) -> Multitree {
    let mut child = parent.clone();
    if child.trees.is_empty() || donor.trees.is_empty() {
        return child;
    }
    let t = rng.gen_range(0..child.trees.len());
    let donor_tree = &donor.trees[t.min(donor.trees.len() - 1)];

    let graft = {
        let idx = rng.gen_range(0..donor_tree.size());
        donor_tree
            .nth_node(idx)
            .cloned()
            .unwrap_or_else(|| donor_tree.clone())
    };
    let target = rng.gen_range(0..child.trees[t].size());
    if target == 0 {
        child.trees[t] = graft;
    } else if let Some(site) = child.trees[t].nth_node_mut(target) {
        *site = graft;
    }
    child
}

/// Replace a random subtree of one of the parent's trees with a freshly
/// grown tree of at most `max_depth`.
pub fn subtree_mutation<R: Rng>(
    parent: &Multitree,
    vocab: &Vocabulary,
    max_depth: usize,
    rng: &mut R,
) -> Multitree {
    let mut child = parent.clone();
    if child.trees.is_empty() {
        return child;
    }
    let t = rng.gen_range(0..child.trees.len());
    let replacement = random_tree(vocab, max_depth, rng);
    let target = rng.gen_range(0..child.trees[t].size());
    if target == 0 {
        child.trees[t] = replacement;
    } else if let Some(site) = child.trees[t].nth_node_mut(target) {
        *site = replacement;
    }
    child
}

/// Resample individual symbols in place with per-node probability `prob`.
/// Internal nodes keep their arity; leaves are redrawn from the leaf
/// vocabulary.
pub fn point_mutation<R: Rng>(
    parent: &Multitree,
    vocab: &Vocabulary,
    prob: f64,
    rng: &mut R,
) -> Multitree {
    let mut child = parent.clone();
    for tree in &mut child.trees {
        point_mutate_node(tree, vocab, prob, rng);
    }
    child
}

fn point_mutate_node<R: Rng>(node: &mut TreeNode, vocab: &Vocabulary, prob: f64, rng: &mut R) {
    if rng.gen_bool(prob) {
        match node {
            TreeNode::Const(_) | TreeNode::Feature(_) => {
                *node = vocab.random_leaf(rng);
            }
            TreeNode::Unary { op, .. } => {
                if let Some(new_op) = vocab.random_unary(rng) {
                    *op = new_op;
                }
            }
            TreeNode::Binary { op, .. } => {
                if let Some(new_op) = vocab.random_binary(rng) {
                    *op = new_op;
                }
            }
        }
    }
    match node {
        TreeNode::Const(_) | TreeNode::Feature(_) => {}
        TreeNode::Unary { arg, .. } => point_mutate_node(arg, vocab, prob, rng),
        TreeNode::Binary { left, right, .. } => {
            point_mutate_node(left, vocab, prob, rng);
            point_mutate_node(right, vocab, prob, rng);
        }
    }
}

/// Perturb each coefficient with probability `prob` by Gaussian noise scaled
/// to `temp` times its magnitude (unit scale for near-zero coefficients).
pub fn coeff_mutation<R: Rng>(parent: &Multitree, prob: f64, temp: f64, rng: &mut R) -> Multitree {
    let mut child = parent.clone();
    let mut coeffs = child.coefficients();
    for c in &mut coeffs {
        if rng.gen_bool(prob) {
            let scale = if c.abs() > 1e-12 { c.abs() } else { 1.0 };
            *c += temp * scale * standard_normal(rng);
        }
    }
    child.set_coefficients(&coeffs);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::random_multitree;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn vocab() -> Vocabulary {
        Vocabulary::arithmetic(2)
    }

    #[test]
    fn test_crossover_leaves_parents_unchanged() {
        let mut rng = StdRng::seed_from_u64(31);
        let parent = random_multitree(2, &vocab(), 4, &mut rng);
        let donor = random_multitree(2, &vocab(), 4, &mut rng);
        let parent_repr = format!("{}", parent);
        let donor_repr = format!("{}", donor);
        for _ in 0..20 {
            let _ = subtree_crossover(&parent, &donor, &mut rng);
        }
        assert_eq!(format!("{}", parent), parent_repr);
        assert_eq!(format!("{}", donor), donor_repr);
    }

    #[test]
    fn test_subtree_mutation_changes_some_offspring() {
        let mut rng = StdRng::seed_from_u64(31);
        let parent = random_multitree(1, &vocab(), 4, &mut rng);
        let parent_repr = format!("{}", parent);
        let changed = (0..20)
            .map(|_| subtree_mutation(&parent, &vocab(), 3, &mut rng))
            .any(|child| format!("{}", child) != parent_repr);
        assert!(changed);
    }

    #[test]
    fn test_point_mutation_preserves_shape() {
        let mut rng = StdRng::seed_from_u64(31);
        let parent = random_multitree(2, &vocab(), 4, &mut rng);
        let child = point_mutation(&parent, &vocab(), 1.0, &mut rng);
        assert_eq!(child.size(), parent.size());
        for (a, b) in parent.trees.iter().zip(&child.trees) {
            assert_eq!(a.depth(), b.depth());
        }
    }

    #[test]
    fn test_coeff_mutation_touches_only_coefficients() {
        let mut rng = StdRng::seed_from_u64(31);
        let parent = random_multitree(2, &vocab(), 4, &mut rng);
        let child = coeff_mutation(&parent, 1.0, 0.5, &mut rng);
        assert_eq!(child.size(), parent.size());
        assert_eq!(
            parent.coefficients().len(),
            child.coefficients().len()
        );
    }

    #[test]
    fn test_offspring_stats_follow_parent_until_reset() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut parent = random_multitree(1, &vocab(), 3, &mut rng);
        parent.fitness = Some(1.0);
        let mut child = coeff_mutation(&parent, 1.0, 0.1, &mut rng);
        child.reset_stats();
        assert!(child.fitness.is_none());
    }
}
