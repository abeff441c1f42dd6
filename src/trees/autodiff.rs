use crate::trees::Multitree;
use crate::types::{protected_denominator, BinaryOp, TreeNode, UnaryOp, PROTECTED_EPS};

/// Postorder tape entry; child fields index earlier entries of the same tape.
#[derive(Debug, Clone, Copy)]
enum TapeEntry {
    Coeff(usize),
    Feature(usize),
    Unary { op: UnaryOp, arg: usize },
    Binary { op: BinaryOp, left: usize, right: usize },
}

/// A single tree flattened to postorder for forward evaluation and
/// reverse-mode gradient accumulation. Coefficient entries index into a flat
/// coefficient vector shared across the whole multitree, so an optimizer can
/// update coefficients without rebuilding trees between steps.
#[derive(Debug, Clone)]
pub struct Tape {
    entries: Vec<TapeEntry>,
}

impl Tape {
    fn compile(tree: &TreeNode, next_coeff: &mut usize) -> Self {
        let mut entries = Vec::with_capacity(tree.size());
        Self::push(tree, next_coeff, &mut entries);
        Tape { entries }
    }

    fn push(node: &TreeNode, next_coeff: &mut usize, entries: &mut Vec<TapeEntry>) -> usize {
        let entry = match node {
            TreeNode::Const(_) => {
                let idx = *next_coeff;
                *next_coeff += 1;
                TapeEntry::Coeff(idx)
            }
            TreeNode::Feature(i) => TapeEntry::Feature(*i),
            TreeNode::Unary { op, arg } => {
                let arg = Self::push(arg, next_coeff, entries);
                TapeEntry::Unary { op: *op, arg }
            }
            TreeNode::Binary { op, left, right } => {
                let left = Self::push(left, next_coeff, entries);
                let right = Self::push(right, next_coeff, entries);
                TapeEntry::Binary {
                    op: *op,
                    left,
                    right,
                }
            }
        };
        entries.push(entry);
        entries.len() - 1
    }

    /// Forward pass for one state; fills and returns the per-entry values.
    /// The output of the tree is the last entry.
    pub fn forward(&self, state: &[f64], coeffs: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.entries.len()];
        for (i, entry) in self.entries.iter().enumerate() {
            values[i] = match *entry {
                TapeEntry::Coeff(c) => coeffs[c],
                TapeEntry::Feature(f) => state.get(f).copied().unwrap_or(0.0),
                TapeEntry::Unary { op, arg } => op.apply(values[arg]),
                TapeEntry::Binary { op, left, right } => op.apply(values[left], values[right]),
            };
        }
        values
    }

    pub fn output(&self, values: &[f64]) -> f64 {
        *values.last().unwrap_or(&0.0)
    }

    /// Reverse pass: given the forward values and the adjoint of the output,
    /// accumulate d(output)/d(coefficient) * seed into `grads`.
    pub fn backward(&self, values: &[f64], seed: f64, grads: &mut [f64]) {
        let mut adjoints = vec![0.0; self.entries.len()];
        if let Some(last) = adjoints.last_mut() {
            *last = seed;
        }
        for (i, entry) in self.entries.iter().enumerate().rev() {
            let upstream = adjoints[i];
            if upstream == 0.0 {
                continue;
            }
            match *entry {
                TapeEntry::Coeff(c) => grads[c] += upstream,
                TapeEntry::Feature(_) => {}
                TapeEntry::Unary { op, arg } => {
                    adjoints[arg] += upstream * unary_derivative(op, values[arg]);
                }
                TapeEntry::Binary { op, left, right } => {
                    let (dl, dr) = binary_derivatives(op, values[left], values[right]);
                    adjoints[left] += upstream * dl;
                    adjoints[right] += upstream * dr;
                }
            }
        }
    }
}

fn unary_derivative(op: UnaryOp, x: f64) -> f64 {
    match op {
        UnaryOp::Neg => -1.0,
        UnaryOp::Sin => x.cos(),
        UnaryOp::Cos => -x.sin(),
        UnaryOp::Tanh => {
            let t = x.tanh();
            1.0 - t * t
        }
        UnaryOp::Exp => x.exp(),
        UnaryOp::Log => x.signum() / (x.abs() + PROTECTED_EPS),
        UnaryOp::Sqrt => x.signum() / (2.0 * x.abs().sqrt() + PROTECTED_EPS),
    }
}

fn binary_derivatives(op: BinaryOp, l: f64, r: f64) -> (f64, f64) {
    match op {
        BinaryOp::Add => (1.0, 1.0),
        BinaryOp::Sub => (1.0, -1.0),
        BinaryOp::Mul => (r, l),
        BinaryOp::Div => {
            let d = protected_denominator(r);
            // Inside the clamped region the denominator is constant in r
            let dr = if r.abs() < PROTECTED_EPS {
                0.0
            } else {
                -l / (d * d)
            };
            (1.0 / d, dr)
        }
    }
}

/// Tapes for every tree of a multitree, sharing one flat coefficient space.
#[derive(Debug, Clone)]
pub struct MultitreeTape {
    tapes: Vec<Tape>,
    num_coefficients: usize,
}

impl MultitreeTape {
    pub fn compile(individual: &Multitree) -> Self {
        let mut next_coeff = 0;
        let tapes = individual
            .trees
            .iter()
            .map(|t| Tape::compile(t, &mut next_coeff))
            .collect();
        Self {
            tapes,
            num_coefficients: next_coeff,
        }
    }

    pub fn num_coefficients(&self) -> usize {
        self.num_coefficients
    }

    pub fn tape(&self, action: usize) -> &Tape {
        &self.tapes[action]
    }

    /// Value of one action's tree for a state, under the given coefficients.
    pub fn value(&self, action: usize, state: &[f64], coeffs: &[f64]) -> f64 {
        let tape = &self.tapes[action];
        tape.output(&tape.forward(state, coeffs))
    }
}
