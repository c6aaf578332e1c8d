/// Uniform sampler driving every random decision of the search.
///
/// The engine owns exactly one source and draws from it on the controller
/// thread. Anything that samples from other threads must take its own
/// stream via [`RandomSource::fork`].
pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    fn reseed(&mut self, seed: u64);

    /// Independent sub-stream derived from the current state.
    fn fork(&mut self) -> Box<dyn RandomSource>;

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    fn coin(&mut self) -> bool {
        self.next_f64() < 0.5
    }
}

pub struct FastRandom {
    rng: fastrand::Rng,
}

impl FastRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl RandomSource for FastRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.f64()
    }

    fn reseed(&mut self, seed: u64) {
        self.rng.seed(seed);
    }

    fn fork(&mut self) -> Box<dyn RandomSource> {
        Box::new(FastRandom {
            rng: self.rng.fork(),
        })
    }
}

/// Replays a fixed cycle of draws. Pins down every random decision, which
/// makes candidate formulas checkable by hand.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }

    fn reseed(&mut self, _seed: u64) {
        self.cursor = 0;
    }

    fn fork(&mut self) -> Box<dyn RandomSource> {
        Box::new(self.clone())
    }
}
