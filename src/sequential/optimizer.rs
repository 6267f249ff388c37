use super::layer::{Layer, Dense};
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Optimizer: Send + Sync {
    fn step(&self, layers: &mut [Box<dyn Layer>]);
    fn clone_box(&self) -> Box<dyn Optimizer>;
}


// SGD with optional element-wise gradient clipping

#[derive(Serialize, Deserialize, Clone)]
pub struct SGD {
    learning_rate: f32,
    clip: Option<f32>
}

impl SGD {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            clip: None
        }
    }

    pub fn with_clip(mut self, clip: Option<f32>) -> Self {
        self.clip = clip;
        self
    }

    fn clipped(&self, gradient: f32) -> f32 {
        match self.clip {
            Some(limit) => gradient.clamp(-limit, limit),
            None => gradient,
        }
    }
}

#[typetag::serde]
impl Optimizer for SGD {
    fn step(&self, layers: &mut [Box<dyn Layer>]) {
        for layer in layers {
            let Some(dense_layer) = layer.as_any_mut().downcast_mut::<Dense>() else {
                continue;
            };
            let (Some(d_weights), Some(d_biases)) = (dense_layer.d_weights.take(), dense_layer.d_biases.take()) else {
                continue;
            };

            dense_layer.weights = dense_layer.weights.map2(&d_weights, |w, dw| {
                w - self.learning_rate * self.clipped(dw)
            });
            dense_layer.biases = dense_layer.biases.map2(&d_biases, |b, db| {
                b - self.learning_rate * self.clipped(db)
            });
        }
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}
