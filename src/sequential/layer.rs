use super::tensor::Tensor;
use rand::Rng;
use std::any::Any;
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Layer: Send + Sync {
    /// Training pass, caches what `backward` needs.
    fn forward(&mut self, input: &Tensor) -> Tensor;
    /// Inference pass, no caching.
    fn infer(&self, input: &Tensor) -> Tensor;
    fn backward(&mut self, d_output: &Tensor) -> Tensor;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn Layer>;
}


// dense layer

#[derive(Serialize, Deserialize, Clone)]
pub struct Dense {
    pub weights: Tensor,
    pub biases: Tensor,
    #[serde(skip)]
    cached_input: Option<Tensor>,
    #[serde(skip)]
    pub d_weights: Option<Tensor>,
    #[serde(skip)]
    pub d_biases: Option<Tensor>
}

impl Dense {
    /// He-initialised weights, zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let std = (2.0 / input_size.max(1) as f32).sqrt();
        Self::from_parts(
            Tensor::random(input_size, output_size, std, rng),
            Tensor::zeros(1, output_size),
        )
    }

    pub fn from_parts(weights: Tensor, biases: Tensor) -> Self {
        Self {
            weights,
            biases,
            cached_input: None,
            d_weights: None,
            d_biases: None
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.cols()
    }
}

#[typetag::serde]
impl Layer for Dense {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());
        self.infer(input)
    }

    fn infer(&self, input: &Tensor) -> Tensor {
        input.matmul(&self.weights).add_row(&self.biases)
    }

    // a backward call without a preceding forward yields a zero gradient
    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let Some(cached_input) = &self.cached_input else {
            return Tensor::zeros(d_output.rows(), self.input_size());
        };

        // dL/dW = input.T @ dL/dY
        self.d_weights = Some(cached_input.transpose().matmul(d_output));

        // dL/db = dL/dY summed over the batch
        self.d_biases = Some(d_output.sum_rows());

        // dL/dX = dL/dY @ weights.T
        d_output.matmul(&self.weights.transpose())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}


// relu layer

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ReLU {
    #[serde(skip)]
    cached_input: Option<Tensor>
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

#[typetag::serde]
impl Layer for ReLU {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());
        self.infer(input)
    }

    fn infer(&self, input: &Tensor) -> Tensor {
        input.map(|x| x.max(0.0))
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        match &self.cached_input {
            Some(cached_input) => cached_input.map2(d_output, |input_val, output_val| {
                if input_val > 0.0 { output_val } else { 0.0 }
            }),
            None => Tensor::zeros(d_output.rows(), d_output.cols()),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}


// softmax layer, only used in front of a loss that expects probabilities

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Softmax;

impl Softmax {
    pub fn new() -> Self {
        Self
    }
}

#[typetag::serde]
impl Layer for Softmax {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.infer(input)
    }

    fn infer(&self, input: &Tensor) -> Tensor {
        let cols = input.cols();
        let mut data = Vec::with_capacity(input.data().len());
        for r in 0..input.rows() {
            let row = input.row(r);
            let max_val = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let exps: Vec<f32> = row.iter().map(|&x| (x - max_val).exp()).collect();
            let sum: f32 = exps.iter().sum();
            data.extend(exps.into_iter().map(|e| e / sum));
        }
        Tensor::from_vec(data, input.rows(), cols)
    }

    // paired with cross entropy, whose gradient is already taken w.r.t. the logits
    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        d_output.clone()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32]) {
        let tolerance = 1e-6;
        assert_eq!(a.len(), b.len(), "vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tolerance, "mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    fn fixed_dense() -> Dense {
        Dense::from_parts(
            Tensor::from_rows(&[[10.0, 20.0], [30.0, 40.0]]),
            Tensor::from_rows(&[[1.0, 2.0]]),
        )
    }

    #[test]
    fn test_dense_forward() {
        let input = Tensor::from_rows(&[[1.0, 2.0]]);
        let mut layer = fixed_dense();

        // [1, 2] @ [[10, 20], [30, 40]] + [1, 2] = [71, 102]
        let output = layer.forward(&input);

        assert_eq!(output.shape(), (1, 2));
        assert_vec_approx_eq(output.data(), &[71.0, 102.0]);
        assert_eq!(layer.infer(&input), output);
    }

    #[test]
    fn test_dense_backward() {
        let input = Tensor::from_rows(&[[1.0, 2.0]]);
        let d_output = Tensor::from_rows(&[[5.0, 8.0]]);
        let mut layer = fixed_dense();

        layer.forward(&input);

        // [5, 8] @ [[10, 30], [20, 40]] = [210, 470]
        let d_input = layer.backward(&d_output);
        assert_vec_approx_eq(d_input.data(), &[210.0, 470.0]);

        // [[1], [2]] @ [[5, 8]]
        assert_vec_approx_eq(layer.d_weights.as_ref().unwrap().data(), &[5.0, 8.0, 10.0, 16.0]);
        assert_vec_approx_eq(layer.d_biases.as_ref().unwrap().data(), &[5.0, 8.0]);
    }

    #[test]
    fn test_dense_new_shapes() {
        let layer = Dense::new(16, 4, &mut StdRng::seed_from_u64(0));
        assert_eq!(layer.weights.shape(), (16, 4));
        assert_eq!(layer.biases.shape(), (1, 4));
        assert!(layer.weights.is_finite());
    }

    #[test]
    fn test_relu_forward_backward() {
        let input = Tensor::from_rows(&[[-10.0, -0.5, 0.0, 0.5, 10.0]]);
        let mut layer = ReLU::new();

        let output = layer.forward(&input);
        assert_vec_approx_eq(output.data(), &[0.0, 0.0, 0.0, 0.5, 10.0]);

        let d_input = layer.backward(&Tensor::from_rows(&[[1.0; 5]]));
        assert_vec_approx_eq(d_input.data(), &[0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_softmax_forward() {
        let input = Tensor::from_rows(&[[0.0, 1.0, 2.0]]);
        let output = Softmax::new().infer(&input);

        let sum: f32 = output.data().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_vec_approx_eq(output.data(), &[0.09003057, 0.24472847, 0.66524094]);
    }
}
