use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Row-major 2D buffer: one sample per row, one feature per column.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl Tensor {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Normal(0, std) entries.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, std: f32, rng: &mut R) -> Self {
        let data = (0..rows * cols)
            .map(|_| rng.sample::<f32, _>(StandardNormal) * std)
            .collect();
        Self { data, rows, cols }
    }

    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols, "data length must equal rows * cols");
        Self { data, rows, cols }
    }

    pub fn from_rows<const N: usize>(rows: &[[f32; N]]) -> Self {
        let data = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Self::from_vec(data, rows.len(), N)
    }

    pub fn rows(&self) -> usize {self.rows}
    pub fn cols(&self) -> usize {self.cols}
    pub fn shape(&self) -> (usize, usize) {(self.rows, self.cols)}
    pub fn data(&self) -> &[f32] {&self.data}

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn transpose(&self) -> Tensor {
        let mut out = Tensor::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    // self @ other
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.cols, other.rows, "self columns must equal other rows");

        let k = self.cols;
        let n = other.cols;
        let mut out = Tensor::zeros(self.rows, n);
        if n == 0 {
            return out;
        }

        out.data.par_chunks_mut(n).enumerate().for_each(|(m_idx, out_row)| {
            let a_row = &self.data[m_idx * k..(m_idx + 1) * k];
            for (k_idx, &a_val) in a_row.iter().enumerate() {
                let b_row = &other.data[k_idx * n..(k_idx + 1) * n];
                for (out_val, &b_val) in out_row.iter_mut().zip(b_row) {
                    *out_val += a_val * b_val;
                }
            }
        });

        out
    }

    /// Adds `bias` (1 x cols) to every row.
    pub fn add_row(&self, bias: &Tensor) -> Tensor {
        assert_eq!(bias.shape(), (1, self.cols), "bias must be 1 x cols");

        let mut out = self.clone();
        if self.cols == 0 {
            return out;
        }
        out.data.par_chunks_mut(self.cols).for_each(|row| {
            for (value, &b) in row.iter_mut().zip(&bias.data) {
                *value += b;
            }
        });
        out
    }

    // column sums, 1 x cols
    pub fn sum_rows(&self) -> Tensor {
        let mut sums = vec![0.0; self.cols];
        for row in self.data.chunks(self.cols.max(1)) {
            for (sum, &value) in sums.iter_mut().zip(row) {
                *sum += value;
            }
        }
        Tensor::from_vec(sums, 1, self.cols)
    }

    pub fn map<F>(&self, f: F) -> Tensor
    where F: Fn(f32) -> f32 + Sync + Send {
        let data = self.data.par_iter().map(|&x| f(x)).collect();
        Tensor::from_vec(data, self.rows, self.cols)
    }

    // element-wise combination with a same-shaped tensor
    pub fn map2<F>(&self, other: &Tensor, f: F) -> Tensor
    where F: Fn(f32, f32) -> f32 + Sync + Send {
        assert_eq!(self.shape(), other.shape(), "tensors must have the same shape");

        let data = self.data.par_iter().zip(other.data.par_iter()).map(|(&a, &b)| f(a, b)).collect();
        Tensor::from_vec(data, self.rows, self.cols)
    }

    pub fn gather_rows(&self, indices: &[usize]) -> Tensor {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &index in indices {
            assert!(index < self.rows, "row index out of bounds");
            data.extend_from_slice(self.row(index));
        }
        Tensor::from_vec(data, indices.len(), self.cols)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
         .field("shape", &self.shape())
         .field("data", &self.data)
         .finish()
    }
}
