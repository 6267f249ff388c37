use super::tensor::Tensor;
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Loss: Send + Sync {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32;
    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor;
    /// True when predictions must go through a softmax before this loss.
    fn expects_probabilities(&self) -> bool {
        false
    }
    fn clone_box(&self) -> Box<dyn Loss>;
}


// mean squared error

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct MeanSquaredError;

#[typetag::serde]
impl Loss for MeanSquaredError {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32 {
        let batch_size = y_pred.rows();
        if batch_size == 0 {
            return 0.0;
        }
        let squared_errors = y_pred.map2(y_true, |pred, truth| (pred - truth) * (pred - truth));
        squared_errors.data().iter().sum::<f32>() / batch_size as f32
    }

    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor {
        let batch_size = y_pred.rows().max(1) as f32;
        y_pred.map2(y_true, move |pred, truth| 2.0 * (pred - truth) / batch_size)
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(self.clone())
    }
}


// cross entropy against arbitrary (not necessarily one-hot) targets

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

#[typetag::serde]
impl Loss for CategoricalCrossEntropy {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32 {
        assert_eq!(y_pred.shape(), y_true.shape(), "prediction and true labels must have the same shape.");

        // L = -sum(y_true * log(y_pred))
        let batch_size = y_pred.rows();
        if batch_size == 0 {
            return 0.0;
        }
        const EPSILON: f32 = 1e-9;
        let total: f32 = y_pred
            .data()
            .iter()
            .zip(y_true.data())
            .map(|(&pred, &truth)| -truth * (pred + EPSILON).ln())
            .sum();

        total / batch_size as f32
    }

    // w.r.t. the logits, assuming the predictions came out of a softmax
    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor {
        let batch_size = y_pred.rows().max(1) as f32;
        y_pred.map2(y_true, move |pred, truth| (pred - truth) / batch_size)
    }

    fn expects_probabilities(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(self.clone())
    }
}
