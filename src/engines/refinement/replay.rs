use crate::types::Transition;
use rand::Rng;

/// Fixed-capacity replay memory. Inserts are O(1) amortized: once full, the
/// buffer wraps and the oldest transitions are overwritten.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    buf: Vec<Transition>,
    capacity: usize,
    head: usize,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity: capacity.max(1),
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, transition: Transition) {
        if self.buf.len() < self.capacity {
            self.buf.push(transition);
        } else {
            self.buf[self.head] = transition;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Append a batch of transitions collected during evaluation.
    pub fn absorb(&mut self, transitions: Vec<Transition>) {
        for t in transitions {
            self.push(t);
        }
    }

    /// Sample up to `k` transitions without replacement via a partial
    /// Fisher-Yates shuffle over indices.
    pub fn sample<'a, R: Rng>(&'a self, rng: &mut R, k: usize) -> Vec<&'a Transition> {
        let n = self.buf.len();
        let k = k.min(n);
        let mut indices: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = rng.gen_range(i..n);
            indices.swap(i, j);
        }
        indices[..k].iter().map(|&i| &self.buf[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transition(reward: f64) -> Transition {
        Transition {
            state: vec![reward],
            action: 0,
            next_state: None,
            reward,
        }
    }

    #[test]
    fn test_wraps_at_capacity() {
        let mut memory = ReplayMemory::new(3);
        for i in 0..5 {
            memory.push(transition(i as f64));
        }
        assert_eq!(memory.len(), 3);
        let rewards: Vec<f64> = memory.buf.iter().map(|t| t.reward).collect();
        // 0 and 1 were overwritten by 3 and 4
        assert!(rewards.contains(&2.0));
        assert!(rewards.contains(&3.0));
        assert!(rewards.contains(&4.0));
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut memory = ReplayMemory::new(64);
        for i in 0..20 {
            memory.push(transition(i as f64));
        }
        let mut rng = StdRng::seed_from_u64(3);
        let sample = memory.sample(&mut rng, 10);
        assert_eq!(sample.len(), 10);
        let mut rewards: Vec<f64> = sample.iter().map(|t| t.reward).collect();
        rewards.sort_by(f64::total_cmp);
        rewards.dedup();
        assert_eq!(rewards.len(), 10, "sample contained duplicates");
    }

    #[test]
    fn test_sample_clamps_to_len() {
        let mut memory = ReplayMemory::new(8);
        memory.push(transition(1.0));
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(memory.sample(&mut rng, 5).len(), 1);
    }

    #[test]
    fn test_absorb_appends() {
        let mut memory = ReplayMemory::new(100);
        memory.absorb((0..7).map(|i| transition(i as f64)).collect());
        memory.absorb((0..4).map(|i| transition(i as f64)).collect());
        assert_eq!(memory.len(), 11);
    }
}
