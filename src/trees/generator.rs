use crate::trees::Multitree;
use crate::types::{BinaryOp, TreeNode, UnaryOp};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An internal-node symbol available to random tree growth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalSymbol {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

/// A leaf symbol available to random tree growth. `Coefficient` leaves are
/// sampled uniformly from `[low, high]` at generation time and become the
/// differentiable constants of the individual.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafSymbol {
    Feature(usize),
    Coefficient { low: f64, high: f64 },
}

/// The node vocabulary trees are grown and mutated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub internal: Vec<InternalSymbol>,
    pub leaf: Vec<LeafSymbol>,
}

impl Vocabulary {
    /// Vocabulary over `num_features` state components: the four arithmetic
    /// operators, a few smooth unaries, and a coefficient leaf in [-1, 1].
    pub fn arithmetic(num_features: usize) -> Self {
        let mut leaf: Vec<LeafSymbol> = (0..num_features).map(LeafSymbol::Feature).collect();
        leaf.push(LeafSymbol::Coefficient {
            low: -1.0,
            high: 1.0,
        });
        Self {
            internal: vec![
                InternalSymbol::Binary(BinaryOp::Add),
                InternalSymbol::Binary(BinaryOp::Sub),
                InternalSymbol::Binary(BinaryOp::Mul),
                InternalSymbol::Binary(BinaryOp::Div),
                InternalSymbol::Unary(UnaryOp::Neg),
                InternalSymbol::Unary(UnaryOp::Tanh),
            ],
            leaf,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() || self.leaf.is_empty()
    }

    pub fn random_leaf<R: Rng>(&self, rng: &mut R) -> TreeNode {
        match self.leaf[rng.gen_range(0..self.leaf.len())] {
            LeafSymbol::Feature(i) => TreeNode::Feature(i),
            LeafSymbol::Coefficient { low, high } => TreeNode::Const(rng.gen_range(low..=high)),
        }
    }

    pub fn random_internal<R: Rng>(&self, rng: &mut R) -> InternalSymbol {
        self.internal[rng.gen_range(0..self.internal.len())]
    }

    /// A random unary operator from the vocabulary, if it has any.
    pub fn random_unary<R: Rng>(&self, rng: &mut R) -> Option<UnaryOp> {
        let ops: Vec<UnaryOp> = self
            .internal
            .iter()
            .filter_map(|s| match s {
                InternalSymbol::Unary(op) => Some(*op),
                _ => None,
            })
            .collect();
        if ops.is_empty() {
            None
        } else {
            Some(ops[rng.gen_range(0..ops.len())])
        }
    }

    /// A random binary operator from the vocabulary, if it has any.
    pub fn random_binary<R: Rng>(&self, rng: &mut R) -> Option<BinaryOp> {
        let ops: Vec<BinaryOp> = self
            .internal
            .iter()
            .filter_map(|s| match s {
                InternalSymbol::Binary(op) => Some(*op),
                _ => None,
            })
            .collect();
        if ops.is_empty() {
            None
        } else {
            Some(ops[rng.gen_range(0..ops.len())])
        }
    }
}

/// Grow a random tree of at most `max_depth` levels of internal nodes.
///
/// Grow-style initialization: the root is always internal (when depth
/// allows), below it each position becomes internal with probability 0.5
/// until the depth bound forces a leaf.
pub fn random_tree<R: Rng>(vocab: &Vocabulary, max_depth: usize, rng: &mut R) -> TreeNode {
    grow(vocab, max_depth, 0, rng)
}

fn grow<R: Rng>(vocab: &Vocabulary, max_depth: usize, depth: usize, rng: &mut R) -> TreeNode {
    let force_leaf = depth >= max_depth;
    let want_internal = depth == 0 || rng.gen_bool(0.5);
    if force_leaf || !want_internal {
        return vocab.random_leaf(rng);
    }
    match vocab.random_internal(rng) {
        InternalSymbol::Unary(op) => TreeNode::Unary {
            op,
            arg: Box::new(grow(vocab, max_depth, depth + 1, rng)),
        },
        InternalSymbol::Binary(op) => TreeNode::Binary {
            op,
            left: Box::new(grow(vocab, max_depth, depth + 1, rng)),
            right: Box::new(grow(vocab, max_depth, depth + 1, rng)),
        },
    }
}

/// Generate a random multitree of `num_trees` independently grown trees.
pub fn random_multitree<R: Rng>(
    num_trees: usize,
    vocab: &Vocabulary,
    max_depth: usize,
    rng: &mut R,
) -> Multitree {
    let trees = (0..num_trees)
        .map(|_| random_tree(vocab, max_depth, rng))
        .collect();
    Multitree::new(trees)
}
