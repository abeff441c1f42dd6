/// AdamW with decoupled weight decay and the amsgrad variant (the second
/// moment used for the denominator never decreases).
#[derive(Debug, Clone)]
pub struct AdamW {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    weight_decay: f64,
    t: u64,
    m: Vec<f64>,
    v: Vec<f64>,
    v_max: Vec<f64>,
}

impl AdamW {
    pub fn new(dim: usize, learning_rate: f64, weight_decay: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay,
            t: 0,
            m: vec![0.0; dim],
            v: vec![0.0; dim],
            v_max: vec![0.0; dim],
        }
    }

    /// One update step; `params` and `grads` must both have the dimension
    /// the optimizer was built with.
    pub fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        debug_assert_eq!(params.len(), self.m.len());
        debug_assert_eq!(grads.len(), self.m.len());

        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);

        for i in 0..params.len() {
            let g = grads[i];
            // Decoupled decay: applied to the parameter, not the gradient
            params[i] -= self.learning_rate * self.weight_decay * params[i];

            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            if v_hat > self.v_max[i] {
                self.v_max[i] = v_hat;
            }

            params[i] -= self.learning_rate * m_hat / (self.v_max[i].sqrt() + self.eps);
        }
    }
}
