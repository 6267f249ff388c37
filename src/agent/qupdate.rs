use super::experience::ActionValues;
use crate::game::{Direction, StateVector};

/// One move's worth of experience, held until the next state is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: StateVector,
    pub action: Direction,
    pub reward: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapSource {
    /// `max` over the next state's entry in the experience store.
    Table,
    /// `max` over the approximator's prediction for the next state.
    Model,
}

/// One-step Q-learning backup.
///
/// Table bootstrap: `r + gamma * max Q(s')`.
/// Model bootstrap: `r + model_discount * max predict(s')`, undiscounted by default.
/// A terminal `s'` contributes nothing beyond the reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QUpdate {
    pub gamma: f32,
    pub model_discount: f32,
}

impl QUpdate {
    pub fn new(gamma: f32, model_discount: f32) -> Self {
        Self { gamma, model_discount }
    }

    pub fn target(&self, source: BootstrapSource, reward: u64, next_values: &ActionValues, terminal: bool) -> f32 {
        let reward = reward as f32;
        if terminal {
            return reward;
        }
        let discount = match source {
            BootstrapSource::Table => self.gamma,
            BootstrapSource::Model => self.model_discount,
        };
        reward + discount * max_value(next_values)
    }
}

pub fn max_value(values: &ActionValues) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Index of the largest value, first one wins ties.
pub fn argmax(values: &ActionValues) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_target() {
        let rule = QUpdate::new(0.9, 1.0);
        let target = rule.target(BootstrapSource::Table, 4, &[1.0, 10.0, -2.0, 0.0], false);
        assert!((target - 13.0).abs() < 1e-5);
    }

    #[test]
    fn test_model_target_is_undiscounted_by_default() {
        let rule = QUpdate::new(0.9, 1.0);
        let target = rule.target(BootstrapSource::Model, 8, &[3.0, 1.0, 2.0, 0.5], false);
        assert!((target - 11.0).abs() < 1e-5);
    }

    #[test]
    fn test_terminal_target_is_reward() {
        let rule = QUpdate::new(0.9, 1.0);
        assert_eq!(rule.target(BootstrapSource::Table, 16, &[100.0; 4], true), 16.0);
        assert_eq!(rule.target(BootstrapSource::Model, 0, &[100.0; 4], true), 0.0);
    }

    #[test]
    fn test_argmax_first_tie() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[0.0; 4]), 0);
        assert_eq!(max_value(&[-1.0, -5.0, -0.5, -2.0]), -0.5);
    }
}
