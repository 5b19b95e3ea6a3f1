use crate::api::error::{GeometricError, GeometricResult};
use crate::api::types::PaddedBatch;
use rustml_core::Tensor;

/// Scatter a flat `[N, C]` element batch into a zero-padded `[num_sets, max_set_size, C]` layout.
///
/// `batch[i]` is the set-id of row `i`. The set count is `max(batch) + 1`; ids missing from
/// `batch` become empty sets. Rows keep their input order within each set.
pub fn to_batch(x: &Tensor, batch: &[usize]) -> GeometricResult<PaddedBatch> {
    let num_sets = batch.iter().max().map_or(0, |&id| id + 1);
    to_batch_sized(x, batch, num_sets)
}

/// Like [`to_batch`], with an explicit set count.
pub fn to_batch_sized(x: &Tensor, batch: &[usize], num_sets: usize) -> GeometricResult<PaddedBatch> {
    let shape = x.shape();
    if shape.len() != 2 {
        return Err(GeometricError::ShapeMismatch(format!(
            "element batch must be [N, C], got {:?}",
            shape
        )));
    }
    let (n, channels) = (shape[0], shape[1]);
    if batch.len() != n {
        return Err(GeometricError::ShapeMismatch(format!(
            "{} set ids for {} elements",
            batch.len(),
            n
        )));
    }
    if n == 0 {
        return Err(GeometricError::EmptyBatch);
    }

    let mut counts = vec![0usize; num_sets];
    for &id in batch {
        if id >= num_sets {
            return Err(GeometricError::SetIdOutOfRange { id, num_sets });
        }
        counts[id] += 1;
    }
    let max_set_size = counts.iter().copied().max().unwrap_or(0);

    let src = x.as_slice();
    let mut data = vec![0.0f32; num_sets * max_set_size * channels];
    let mut fill = vec![0usize; num_sets];
    for (row, &id) in src.chunks_exact(channels.max(1)).zip(batch) {
        let offset = (id * max_set_size + fill[id]) * channels;
        data[offset..offset + channels].copy_from_slice(&row[..channels]);
        fill[id] += 1;
    }

    log::trace!(
        "to_batch: {} elements -> {} sets, max_set_size={}",
        n,
        num_sets,
        max_set_size
    );

    Ok(PaddedBatch {
        x: Tensor::from_vec(data, [num_sets, max_set_size, channels])?,
        counts,
    })
}
