use super::experience::{ActionValues, Dataset};
use crate::config::{LossKind, ModelConfig};
use crate::error::{Error, Result};
use crate::game::{StateVector, ACTION_COUNT, CELL_COUNT};
use crate::sequential::{
    tensor::Tensor,
    layer::{Layer, Dense, ReLU},
    loss::{Loss, MeanSquaredError, CategoricalCrossEntropy},
    optimizer::SGD,
    Sequential
};
use rand::Rng;
use serde::{Serialize, Deserialize};

// exponents reach 17 for the largest reachable tile
const FEATURE_SCALE: f32 = 16.0;

/// Regression from an encoded state to four action values.
///
/// Inputs are scaled by a fixed constant and targets by the largest absolute
/// target seen at fit time, so the network always trains on values of order one.
#[derive(Clone, Serialize, Deserialize)]
pub struct QApproximator {
    network: Sequential,
    target_scale: f32,
    fits: usize,
    epochs_trained: usize,
}

impl QApproximator {
    pub fn new<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Self {
        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(config.hidden_layers.len() * 2 + 1);
        let mut input_size = CELL_COUNT;
        for &width in &config.hidden_layers {
            layers.push(Box::new(Dense::new(input_size, width, rng)));
            layers.push(Box::new(ReLU::new()));
            input_size = width;
        }
        layers.push(Box::new(Dense::new(input_size, ACTION_COUNT, rng)));

        let loss: Box<dyn Loss> = match config.loss {
            LossKind::MeanSquaredError => Box::new(MeanSquaredError),
            LossKind::CategoricalCrossEntropy => {
                log::warn!("categorical cross entropy selected for continuous action-value targets, predictions will be softmax-normalised");
                Box::new(CategoricalCrossEntropy::new())
            }
        };
        let optimizer = Box::new(SGD::new(config.learning_rate).with_clip(config.gradient_clip));

        Self {
            network: Sequential::new(layers, loss, optimizer),
            target_scale: 1.0,
            fits: 0,
            epochs_trained: 0,
        }
    }

    pub fn is_trained(&self) -> bool {self.fits > 0}
    pub fn fits(&self) -> usize {self.fits}
    pub fn epochs_trained(&self) -> usize {self.epochs_trained}

    /// Supervised fit on a dataset snapshot; returns the last epoch's loss.
    pub fn fit<R: Rng + ?Sized>(&mut self, dataset: &Dataset, batch_size: usize, epochs: usize, rng: &mut R) -> Result<f32> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }

        let largest = dataset
            .iter()
            .flat_map(|(_, values)| values.iter())
            .filter(|value| value.is_finite())
            .fold(1.0f32, |acc, value| acc.max(value.abs()));
        // never shrink, earlier fits were trained against the old scale
        self.target_scale = self.target_scale.max(largest);

        let mut x_data = Vec::with_capacity(dataset.len() * CELL_COUNT);
        let mut y_data = Vec::with_capacity(dataset.len() * ACTION_COUNT);
        for (state, values) in dataset {
            x_data.extend(scaled_features(state));
            y_data.extend(values.iter().map(|value| value / self.target_scale));
        }
        let x_train = Tensor::from_vec(x_data, dataset.len(), CELL_COUNT);
        let y_train = Tensor::from_vec(y_data, dataset.len(), ACTION_COUNT);

        let losses = self.network.fit(&x_train, &y_train, epochs, batch_size, rng);
        self.fits += 1;
        self.epochs_trained += epochs;

        Ok(losses.last().copied().unwrap_or(0.0))
    }

    /// Always finite, also for states never seen during fitting.
    pub fn predict(&self, state: &StateVector) -> ActionValues {
        let input = Tensor::from_vec(scaled_features(state).to_vec(), 1, CELL_COUNT);
        let output = self.network.predict(&input);

        let mut values = [0.0; ACTION_COUNT];
        let mut sanitized = false;
        for (value, &raw) in values.iter_mut().zip(output.row(0)) {
            let scaled = raw * self.target_scale;
            if scaled.is_finite() {
                *value = scaled;
            } else {
                sanitized = true;
            }
        }
        if sanitized {
            log::warn!("non-finite prediction for state {}, replaced with 0", state.key());
        }
        values
    }
}

fn scaled_features(state: &StateVector) -> [f32; CELL_COUNT] {
    state.features().map(|x| x / FEATURE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn state(tag: u8) -> StateVector {
        let mut cells = [0u8; CELL_COUNT];
        cells[0] = tag;
        cells[5] = 1;
        StateVector::from_exponents(cells)
    }

    fn small_config() -> ModelConfig {
        ModelConfig {
            hidden_layers: vec![8],
            learning_rate: 0.01,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_fit_on_empty_dataset_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = QApproximator::new(&small_config(), &mut rng);
        let result = model.fit(&Vec::new(), 4, 1, &mut rng);
        assert!(matches!(result, Err(Error::EmptyDataset)));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_fit_rejects_zero_batch() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = QApproximator::new(&small_config(), &mut rng);
        let dataset = vec![(state(1), [1.0; 4])];
        assert!(matches!(model.fit(&dataset, 0, 1, &mut rng), Err(Error::InvalidBatchSize)));
    }

    #[test]
    fn test_fit_tracks_epochs() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut model = QApproximator::new(&small_config(), &mut rng);
        let dataset = vec![
            (state(1), [4.0, 0.0, 0.0, 0.0]),
            (state(2), [0.0, 8.0, 0.0, 2.0]),
            (state(3), [0.0, 0.0, 16.0, 0.0]),
        ];

        let loss = model.fit(&dataset, 2, 3, &mut rng).unwrap();

        assert!(loss.is_finite());
        assert!(model.is_trained());
        assert_eq!(model.fits(), 1);
        assert_eq!(model.epochs_trained(), 3);
    }

    #[test]
    fn test_predict_unseen_state_is_finite() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut model = QApproximator::new(&small_config(), &mut rng);
        let dataset = vec![(state(1), [1000.0, -50.0, 0.0, 3.0])];
        model.fit(&dataset, 1, 5, &mut rng).unwrap();

        let unseen = StateVector::from_exponents([17; CELL_COUNT]);
        assert!(model.predict(&unseen).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fit_moves_prediction_toward_target() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = QApproximator::new(&small_config(), &mut rng);
        let target = [10.0, 0.0, 0.0, 0.0];
        let dataset = vec![(state(4), target)];

        let error = |model: &QApproximator| {
            let prediction = model.predict(&state(4));
            prediction.iter().zip(&target).map(|(p, t)| (p - t) * (p - t)).sum::<f32>()
        };

        model.fit(&dataset, 1, 1, &mut rng).unwrap();
        let before = error(&model);
        model.fit(&dataset, 1, 300, &mut rng).unwrap();
        let after = error(&model);

        assert!(after < before, "error went from {} to {}", before, after);
    }

    #[test]
    fn test_classification_loss_is_selectable() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = ModelConfig {
            loss: LossKind::CategoricalCrossEntropy,
            ..small_config()
        };
        let model = QApproximator::new(&config, &mut rng);
        let values = model.predict(&state(1));
        let sum: f32 = values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }
}
