use super::Tensor;
use crate::api::error::{TensorError, TensorResult};
use crate::core::runtime::SOFTMAX_PAR_THRESHOLD;
use crate::core::shape::Shape;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;

impl Tensor {
    // ==================== Element-wise ====================

    /// Element-wise addition with broadcasting.
    pub fn add(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.broadcast_binary(other, |a, b| a + b)
    }

    /// Element-wise multiplication with broadcasting.
    pub fn mul(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.broadcast_binary(other, |a, b| a * b)
    }

    fn broadcast_binary(&self, other: &Tensor, op: impl Fn(f32, f32) -> f32) -> TensorResult<Tensor> {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| op(a, b))
                .collect();
            return Ok(Tensor {
                data: Arc::new(data),
                shape: self.shape.clone(),
            });
        }

        let out_shape = self
            .shape
            .broadcast_with(&other.shape)
            .ok_or_else(|| TensorError::BroadcastError {
                shape1: self.shape().to_vec(),
                shape2: other.shape().to_vec(),
            })?;
        let lhs_strides = broadcast_strides(&self.shape, &out_shape);
        let rhs_strides = broadcast_strides(&other.shape, &out_shape);
        let dims = out_shape.dims();
        let numel = out_shape.numel();

        let mut out = Vec::with_capacity(numel);
        let mut index = vec![0usize; dims.len()];
        let (mut lhs_off, mut rhs_off) = (0usize, 0usize);
        for _ in 0..numel {
            out.push(op(self.data[lhs_off], other.data[rhs_off]));
            // Odometer step over the output index
            for d in (0..dims.len()).rev() {
                index[d] += 1;
                lhs_off += lhs_strides[d];
                rhs_off += rhs_strides[d];
                if index[d] < dims[d] {
                    break;
                }
                lhs_off -= lhs_strides[d] * dims[d];
                rhs_off -= rhs_strides[d] * dims[d];
                index[d] = 0;
            }
        }

        Ok(Tensor {
            data: Arc::new(out),
            shape: out_shape,
        })
    }

    // ==================== Reductions ====================

    /// Sum along a dimension, removing it.
    pub fn sum(&self, dim: i64) -> TensorResult<Tensor> {
        let dim_idx = self.normalize_dim(dim)?;
        let mut dims = self.shape().to_vec();
        dims.remove(dim_idx);
        Tensor::from_vec(self.sum_along(dim_idx), dims)
    }

    /// Sum along a dimension, keeping it with size 1.
    pub fn sum_keepdim(&self, dim: i64) -> TensorResult<Tensor> {
        let dim_idx = self.normalize_dim(dim)?;
        let mut dims = self.shape().to_vec();
        dims[dim_idx] = 1;
        Tensor::from_vec(self.sum_along(dim_idx), dims)
    }

    fn sum_along(&self, dim_idx: usize) -> Vec<f32> {
        let (outer, len, inner) = self.split_at_dim(dim_idx);
        let mut out = vec![0.0f32; outer * inner];
        for o in 0..outer {
            let dst = &mut out[o * inner..(o + 1) * inner];
            for j in 0..len {
                let src = &self.data[(o * len + j) * inner..(o * len + j + 1) * inner];
                for (acc, &v) in dst.iter_mut().zip(src) {
                    *acc += v;
                }
            }
        }
        out
    }

    // ==================== Softmax ====================

    /// Softmax along `dim`.
    ///
    /// A slice whose entries are all `-inf` (fully masked) yields zeros
    /// instead of NaN.
    pub fn softmax(&self, dim: i64) -> TensorResult<Tensor> {
        let dim_idx = self.normalize_dim(dim)?;
        if self.numel() == 0 {
            return Ok(self.clone());
        }
        let (outer, len, inner) = self.split_at_dim(dim_idx);
        let mut out = vec![0.0f32; self.numel()];

        if inner == 1 {
            // Fast path: softmax along the contiguous last dim
            if self.numel() >= SOFTMAX_PAR_THRESHOLD.load(Ordering::Relaxed) {
                out.par_chunks_mut(len)
                    .zip(self.data.par_chunks(len))
                    .for_each(|(out_row, in_row)| softmax_row(in_row, out_row));
            } else {
                out.chunks_mut(len)
                    .zip(self.data.chunks(len))
                    .for_each(|(out_row, in_row)| softmax_row(in_row, out_row));
            }
        } else {
            let mut row_in = vec![0.0f32; len];
            let mut row_out = vec![0.0f32; len];
            for o in 0..outer {
                for i in 0..inner {
                    for j in 0..len {
                        row_in[j] = self.data[(o * len + j) * inner + i];
                    }
                    softmax_row(&row_in, &mut row_out);
                    for j in 0..len {
                        out[(o * len + j) * inner + i] = row_out[j];
                    }
                }
            }
        }

        Ok(Tensor {
            data: Arc::new(out),
            shape: self.shape.clone(),
        })
    }

    // ==================== Masked fill ====================

    /// Replace entries where `mask` is non-zero with `value`. The mask broadcasts.
    pub fn masked_fill(&self, mask: &Tensor, value: f32) -> TensorResult<Tensor> {
        self.broadcast_binary(mask, |v, m| if m != 0.0 { value } else { v })
    }

    // ==================== Concatenation ====================

    /// Concatenate tensors along a dimension.
    pub fn cat(tensors: &[&Tensor], dim: i64) -> TensorResult<Tensor> {
        let first = tensors.first().ok_or(TensorError::EmptyTensor)?;
        let dim_idx = first.normalize_dim(dim)?;

        for t in tensors.iter().skip(1) {
            let compatible = t.ndim() == first.ndim()
                && first
                    .shape()
                    .iter()
                    .zip(t.shape())
                    .enumerate()
                    .all(|(i, (&s1, &s2))| i == dim_idx || s1 == s2);
            if !compatible {
                return Err(TensorError::ShapeMismatch {
                    expected: first.shape().to_vec(),
                    got: t.shape().to_vec(),
                });
            }
        }

        let total: usize = tensors.iter().map(|t| t.shape()[dim_idx]).sum();
        let mut dims = first.shape().to_vec();
        dims[dim_idx] = total;
        let (outer, _, inner) = first.split_at_dim(dim_idx);

        let mut data = Vec::with_capacity(outer * total * inner);
        for o in 0..outer {
            for t in tensors {
                let chunk = t.shape()[dim_idx] * inner;
                data.extend_from_slice(&t.data[o * chunk..(o + 1) * chunk]);
            }
        }

        Tensor::from_vec(data, dims)
    }
}

/// Strides of `shape` laid over the broadcast shape `out`; broadcast dims get stride 0.
fn broadcast_strides(shape: &Shape, out: &Shape) -> Vec<usize> {
    let strides = shape.strides();
    let offset = out.ndim() - shape.ndim();
    (0..out.ndim())
        .map(|i| {
            if i < offset || shape.dims()[i - offset] == 1 {
                0
            } else {
                strides[i - offset]
            }
        })
        .collect()
}

fn softmax_row(input: &[f32], output: &mut [f32]) {
    let max_val = input.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    if max_val == f32::NEG_INFINITY {
        output.fill(0.0);
        return;
    }
    let mut sum_exp = 0.0;
    for (out, &val) in output.iter_mut().zip(input) {
        let exp_val = (val - max_val).exp();
        *out = exp_val;
        sum_exp += exp_val;
    }
    for out in output.iter_mut() {
        *out /= sum_exp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(n: usize, shape: &[usize]) -> Tensor {
        Tensor::from_vec((0..n).map(|v| v as f32).collect(), shape).unwrap()
    }

    #[test]
    fn test_mul_broadcast_per_row_vector() {
        // [2, 3, 2] * [2, 1, 2]: each row of a batch is scaled by that batch's vector
        let x = arange(12, &[2, 3, 2]);
        let q = Tensor::from_vec(vec![1.0, 0.0, 0.0, 2.0], [2, 1, 2]).unwrap();
        let y = x.mul(&q).unwrap();
        assert_eq!(y.shape(), &[2, 3, 2]);
        assert_eq!(
            y.to_vec(),
            vec![0.0, 0.0, 2.0, 0.0, 4.0, 0.0, 0.0, 14.0, 0.0, 18.0, 0.0, 22.0]
        );
    }

    #[test]
    fn test_add_broadcast_and_error() {
        let a = arange(6, &[2, 3]);
        let b = Tensor::from_vec(vec![10.0, 20.0, 30.0], [3]).unwrap();
        assert_eq!(a.add(&b).unwrap().to_vec(), vec![10.0, 21.0, 32.0, 13.0, 24.0, 35.0]);

        let c = Tensor::zeros([4]);
        assert!(matches!(a.add(&c), Err(TensorError::BroadcastError { .. })));
    }

    #[test]
    fn test_sum_dims() {
        let x = arange(6, &[2, 3]);
        assert_eq!(x.sum(-1).unwrap().to_vec(), vec![3.0, 12.0]);
        assert_eq!(x.sum(0).unwrap().to_vec(), vec![3.0, 5.0, 7.0]);

        let k = x.sum_keepdim(1).unwrap();
        assert_eq!(k.shape(), &[2, 1]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0], [2, 3]).unwrap();
        let s = x.softmax(-1).unwrap();
        let data = s.to_vec();
        assert!((data[..3].iter().sum::<f32>() - 1.0).abs() < 1e-6);
        for &v in &data[3..] {
            assert!((v - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_single_element_is_exactly_one() {
        let x = Tensor::from_vec(vec![-3.7, 12.5], [2, 1]).unwrap();
        assert_eq!(x.softmax(-1).unwrap().to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_softmax_fully_masked_row_is_zero() {
        let ninf = f32::NEG_INFINITY;
        let x = Tensor::from_vec(vec![ninf, ninf, 0.5, ninf], [2, 2]).unwrap();
        let s = x.softmax(-1).unwrap().to_vec();
        assert_eq!(s, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_softmax_inner_dim_matches_transposed_last_dim() {
        let x = Tensor::from_vec(vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0], [3, 2]).unwrap();
        let by_col = x.softmax(0).unwrap();
        let xt = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        let by_row = xt.softmax(-1).unwrap().to_vec();
        for j in 0..3 {
            for i in 0..2 {
                let a = by_col.get(&[j, i]).unwrap();
                assert!((a - by_row[i * 3 + j]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_softmax_parallel_path() {
        // 64 * 128 elements is above the default parallel threshold
        let x = Tensor::from_vec((0..64 * 128).map(|v| (v % 7) as f32).collect(), [64, 128]).unwrap();
        let s = x.softmax(-1).unwrap();
        for row in s.as_slice().chunks(128) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_masked_fill_broadcast() {
        let x = arange(4, &[2, 2]);
        let mask = Tensor::from_vec(vec![0.0, 1.0], [2]).unwrap();
        let y = x.masked_fill(&mask, -1.0).unwrap();
        assert_eq!(y.to_vec(), vec![0.0, -1.0, 2.0, -1.0]);
    }

    #[test]
    fn test_cat_last_dim() {
        let a = arange(4, &[2, 1, 2]);
        let b = Tensor::from_vec(vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0], [2, 1, 3]).unwrap();
        let c = Tensor::cat(&[&a, &b], -1).unwrap();
        assert_eq!(c.shape(), &[2, 1, 5]);
        assert_eq!(
            c.to_vec(),
            vec![0.0, 1.0, 9.0, 8.0, 7.0, 2.0, 3.0, 6.0, 5.0, 4.0]
        );
    }

    #[test]
    fn test_cat_errors() {
        assert!(matches!(Tensor::cat(&[], 0), Err(TensorError::EmptyTensor)));
        let a = Tensor::zeros([2, 3]);
        let b = Tensor::zeros([3, 3]);
        assert!(Tensor::cat(&[&a, &b], 1).is_err());
        assert_eq!(Tensor::cat(&[&a, &b], 0).unwrap().shape(), &[5, 3]);
    }
}
