use super::approximator::QApproximator;
use super::experience::{ActionValues, ExperienceStore};
use super::qupdate::argmax;
use crate::config::PolicyKind;
use crate::game::{Direction, StateVector, ACTION_COUNT};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// Anything that can score the four actions of a state.
pub trait ActionValueEstimator {
    fn estimate(&self, state: &StateVector) -> ActionValues;
}

impl ActionValueEstimator for QApproximator {
    fn estimate(&self, state: &StateVector) -> ActionValues {
        self.predict(state)
    }
}

// unseen states score zero
impl ActionValueEstimator for ExperienceStore {
    fn estimate(&self, state: &StateVector) -> ActionValues {
        self.action_values(&state.key()).unwrap_or([0.0; ACTION_COUNT])
    }
}

pub trait Policy {
    fn choose_action(&mut self, state: &StateVector, estimator: &dyn ActionValueEstimator) -> Direction;
}

pub struct UniformRandom {
    rng: StdRng
}

impl UniformRandom {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Policy for UniformRandom {
    fn choose_action(&mut self, _state: &StateVector, _estimator: &dyn ActionValueEstimator) -> Direction {
        Direction::ALL[self.rng.random_range(0..ACTION_COUNT)]
    }
}

pub struct Greedy;

impl Policy for Greedy {
    fn choose_action(&mut self, state: &StateVector, estimator: &dyn ActionValueEstimator) -> Direction {
        Direction::ALL[argmax(&estimator.estimate(state))]
    }
}

pub struct EpsilonGreedy {
    epsilon: f32,
    rng: StdRng
}

impl EpsilonGreedy {
    pub fn new(epsilon: f32, rng: StdRng) -> Self {
        Self { epsilon, rng }
    }
}

impl Policy for EpsilonGreedy {
    fn choose_action(&mut self, state: &StateVector, estimator: &dyn ActionValueEstimator) -> Direction {
        if self.rng.random::<f32>() < self.epsilon {
            Direction::ALL[self.rng.random_range(0..ACTION_COUNT)]
        } else {
            Greedy.choose_action(state, estimator)
        }
    }
}

pub fn build(kind: PolicyKind, epsilon: f32, seed: Option<u64>) -> Box<dyn Policy> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    match kind {
        PolicyKind::Uniform => Box::new(UniformRandom::new(rng)),
        PolicyKind::Greedy => Box::new(Greedy),
        PolicyKind::EpsilonGreedy => Box::new(EpsilonGreedy::new(epsilon, rng)),
    }
}
