pub mod tensor;
pub mod layer;
pub mod loss;
pub mod optimizer;

use tensor::Tensor;
use layer::{Layer, Softmax};
use loss::Loss;
use optimizer::Optimizer;

use std::cmp::min;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize)]
pub struct Sequential {
    pub layers: Vec<Box<dyn Layer>>,
    pub loss: Box<dyn Loss>,
    pub optimizer: Box<dyn Optimizer>
}

impl Sequential {
    pub fn new(layers: Vec<Box<dyn Layer>>, loss: Box<dyn Loss>, optimizer: Box<dyn Optimizer>) -> Self {
        Self {
            layers,
            loss,
            optimizer
        }
    }

    pub fn predict(&self, input: &Tensor) -> Tensor {
        let logits = self.layers.iter().fold(input.clone(), |output, layer| layer.infer(&output));
        self.activate_output(logits)
    }

    /// Mini-batch training over shuffled rows; returns the mean loss of each epoch.
    pub fn fit<R: Rng + ?Sized>(&mut self, x_train: &Tensor, y_train: &Tensor, epochs: usize, batch_size: usize, rng: &mut R) -> Vec<f32> {
        assert_eq!(x_train.rows(), y_train.rows(), "inputs and targets must have the same number of rows");

        let num_samples = x_train.rows();
        let batch_size = batch_size.max(1);
        let mut epoch_losses = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let mut indices: Vec<usize> = (0..num_samples).collect();
            indices.shuffle(rng);

            let mut total_loss = 0.0;
            let mut num_batches = 0;

            for i in (0..num_samples).step_by(batch_size) {
                let end = min(i + batch_size, num_samples);
                let batch_indices = &indices[i..end];

                let x_batch = x_train.gather_rows(batch_indices);
                let y_batch = y_train.gather_rows(batch_indices);

                total_loss += self.train_on_batch(&x_batch, &y_batch);
                num_batches += 1;
            }

            let mean_loss = total_loss / num_batches.max(1) as f32;
            log::debug!("epoch {}/{}: loss {:.6}", epoch + 1, epochs, mean_loss);
            epoch_losses.push(mean_loss);
        }

        epoch_losses
    }

    /// One forward/backward/step pass; returns the batch loss before the step.
    pub fn train_on_batch(&mut self, x_batch: &Tensor, y_batch: &Tensor) -> f32 {
        let mut logits = x_batch.clone();
        for layer in &mut self.layers {
            logits = layer.forward(&logits);
        }
        let y_pred = self.activate_output(logits);

        let loss = self.loss.calculate(&y_pred, y_batch);

        let mut d_output = self.loss.gradient(&y_pred, y_batch);
        for layer in self.layers.iter_mut().rev() {
            d_output = layer.backward(&d_output);
        }
        self.optimizer.step(&mut self.layers);

        loss
    }

    fn activate_output(&self, logits: Tensor) -> Tensor {
        if self.loss.expects_probabilities() {
            Softmax::new().infer(&logits)
        } else {
            logits
        }
    }
}

impl Clone for Sequential {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(|layer| layer.clone_box()).collect(),
            loss: self.loss.clone_box(),
            optimizer: self.optimizer.clone_box()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequential::layer::{Dense, ReLU};
    use crate::sequential::loss::{CategoricalCrossEntropy, MeanSquaredError};
    use crate::sequential::optimizer::SGD;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn linear_model() -> Sequential {
        let dense_layer = Dense::from_parts(
            Tensor::from_rows(&[[0.5], [-0.5]]),
            Tensor::from_rows(&[[0.1]]),
        );
        Sequential::new(vec![Box::new(dense_layer)], Box::new(MeanSquaredError), Box::new(SGD::new(0.01)))
    }

    fn dense_weights(model: &Sequential, index: usize) -> Vec<f32> {
        model.layers[index].as_any().downcast_ref::<Dense>().unwrap().weights.data().to_vec()
    }

    #[test]
    fn test_sequential_fit_updates_weights() {
        let mut model = linear_model();
        let initial_weights = dense_weights(&model, 0);

        let x_train = Tensor::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let y_train = Tensor::from_rows(&[[1.0], [2.0]]);

        let losses = model.fit(&x_train, &y_train, 1, 1, &mut StdRng::seed_from_u64(0));

        assert_eq!(losses.len(), 1);
        let final_weights = dense_weights(&model, 0);
        assert_ne!(initial_weights[0], final_weights[0], "weights did not update");
        assert_ne!(initial_weights[1], final_weights[1], "weights did not update");
    }

    #[test]
    fn test_fit_reduces_loss_on_linear_target() {
        let mut model = linear_model();
        // y = x0 + x1
        let x_train = Tensor::from_rows(&[[0.1, 0.2], [0.3, 0.1], [0.5, 0.5], [0.9, 0.2]]);
        let y_train = Tensor::from_rows(&[[0.3], [0.4], [1.0], [1.1]]);

        let losses = model.fit(&x_train, &y_train, 200, 4, &mut StdRng::seed_from_u64(1));

        assert!(losses[199] < losses[0], "loss went from {} to {}", losses[0], losses[199]);
    }

    #[test]
    fn test_predict_matches_training_forward() {
        let mut rng = StdRng::seed_from_u64(4);
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Dense::new(3, 5, &mut rng)),
            Box::new(ReLU::new()),
            Box::new(Dense::new(5, 2, &mut rng)),
        ];
        let model = Sequential::new(layers, Box::new(MeanSquaredError), Box::new(SGD::new(0.1)));
        let input = Tensor::from_rows(&[[1.0, -1.0, 0.5]]);

        let mut forward = input.clone();
        let mut training_copy = model.clone();
        for layer in &mut training_copy.layers {
            forward = layer.forward(&forward);
        }

        assert_eq!(model.predict(&input), forward);
    }

    #[test]
    fn test_train_on_batch() {
        let mut model = linear_model();
        let initial_weights = dense_weights(&model, 0);

        let loss = model.train_on_batch(&Tensor::from_rows(&[[1.0, 2.0]]), &Tensor::from_rows(&[[1.0]]));

        assert!(loss > 0.0);
        assert_ne!(initial_weights, dense_weights(&model, 0), "weights did not update after a training step");
    }

    #[test]
    fn test_probability_loss_softmaxes_predictions() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = Sequential::new(
            vec![Box::new(Dense::new(2, 3, &mut rng))],
            Box::new(CategoricalCrossEntropy::new()),
            Box::new(SGD::new(0.1)),
        );
        let output = model.predict(&Tensor::from_rows(&[[1.0, 2.0]]));
        let sum: f32 = output.data().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bincode_roundtrip() {
        let mut rng = StdRng::seed_from_u64(8);
        let model = Sequential::new(
            vec![Box::new(Dense::new(4, 3, &mut rng)), Box::new(ReLU::new()), Box::new(Dense::new(3, 2, &mut rng))],
            Box::new(MeanSquaredError),
            Box::new(SGD::new(0.05).with_clip(Some(2.0))),
        );

        let bytes = bincode::serialize(&model).unwrap();
        let restored: Sequential = bincode::deserialize(&bytes).unwrap();

        let input = Tensor::from_rows(&[[0.1, 0.2, 0.3, 0.4]]);
        assert_eq!(model.predict(&input), restored.predict(&input));
        assert_eq!(restored.layers.len(), 3);
    }
}
