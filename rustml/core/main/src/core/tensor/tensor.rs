//! Dense f32 tensor with Arc-shared row-major storage.

use crate::api::error::{TensorError, TensorResult};
use crate::core::shape::Shape;
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use std::fmt;
use std::sync::Arc;

/// A multi-dimensional f32 array.
///
/// Storage is contiguous and row-major. Cloning and reshaping share the
/// underlying buffer; every operation that changes values allocates a new one.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) data: Arc<Vec<f32>>,
    pub(crate) shape: Shape,
}

impl Tensor {
    // ==================== Constructors ====================

    /// Create a tensor from an f32 vector with the given shape.
    pub fn from_vec(data: Vec<f32>, shape: impl Into<Shape>) -> TensorResult<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self {
            data: Arc::new(data),
            shape,
        })
    }

    /// Create a tensor from little-endian f32 bytes (e.g. a safetensors view).
    ///
    /// The byte slice does not need to be 4-byte aligned.
    pub fn from_bytes(bytes: &[u8], shape: impl Into<Shape>) -> TensorResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(TensorError::InvalidOperation(format!(
                "byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let data: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
        Self::from_vec(data, shape)
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, 0.0)
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::full(shape, 1.0)
    }

    /// Create a tensor filled with a specific value.
    pub fn full(shape: impl Into<Shape>, value: f32) -> Self {
        let shape = shape.into();
        Self {
            data: Arc::new(vec![value; shape.numel()]),
            shape,
        }
    }

    /// Create a tensor with values drawn uniformly from `[low, high)`.
    pub fn uniform<R: Rng + ?Sized>(
        shape: impl Into<Shape>,
        low: f32,
        high: f32,
        rng: &mut R,
    ) -> TensorResult<Self> {
        if !(low < high) {
            return Err(TensorError::InvalidOperation(format!(
                "uniform: low ({}) must be less than high ({})",
                low, high
            )));
        }
        let dist = Uniform::new(low, high);
        Ok(Self::from_fn(shape, |_| dist.sample(rng)))
    }

    /// Create a tensor whose element at flat index `i` is `f(i)`.
    pub fn from_fn(shape: impl Into<Shape>, f: impl FnMut(usize) -> f32) -> Self {
        let shape = shape.into();
        let data: Vec<f32> = (0..shape.numel()).map(f).collect();
        Self {
            data: Arc::new(data),
            shape,
        }
    }

    // ==================== Accessors ====================

    pub fn shape(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Size of dimension `dim` (negative values count from the end).
    pub fn dim_size(&self, dim: i64) -> TensorResult<usize> {
        let idx = self.normalize_dim(dim)?;
        Ok(self.shape.dims()[idx])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.as_ref().clone()
    }

    /// Raw native-endian bytes of the data.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data.as_slice())
    }

    /// Read a single element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> TensorResult<f32> {
        if indices.len() != self.ndim() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: indices.to_vec(),
            });
        }
        let strides = self.shape.strides();
        let mut offset = 0;
        for (d, (&idx, &size)) in indices.iter().zip(self.shape()).enumerate() {
            if idx >= size {
                return Err(TensorError::IndexOutOfBounds {
                    dim: d,
                    index: idx,
                    size,
                });
            }
            offset += idx * strides[d];
        }
        Ok(self.data[offset])
    }

    // ==================== Shape ops ====================

    /// View the data with a new shape. Shares storage with `self`.
    pub fn reshape(&self, shape: impl Into<Shape>) -> TensorResult<Tensor> {
        let shape = shape.into();
        if shape.numel() != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            data: Arc::clone(&self.data),
            shape,
        })
    }

    pub(crate) fn normalize_dim(&self, dim: i64) -> TensorResult<usize> {
        let ndim = self.ndim() as i64;
        let normalized = if dim < 0 { dim + ndim } else { dim };
        if normalized >= 0 && normalized < ndim {
            Ok(normalized as usize)
        } else {
            Err(TensorError::InvalidDimension {
                dim,
                ndim: self.ndim(),
            })
        }
    }

    /// Split the shape around `dim` into (outer, len, inner) extents.
    pub(crate) fn split_at_dim(&self, dim_idx: usize) -> (usize, usize, usize) {
        let dims = self.shape();
        let outer: usize = dims[..dim_idx].iter().product();
        let inner: usize = dims[dim_idx + 1..].iter().product();
        (outer, dims[dim_idx], inner)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 8;
        let head = &self.data[..self.data.len().min(PREVIEW)];
        write!(f, "Tensor(shape={}, data={:?}", self.shape, head)?;
        if self.data.len() > PREVIEW {
            write!(f, "..+{}", self.data.len() - PREVIEW)?;
        }
        write!(f, ")")
    }
}
