use crate::core::density::{DensityNormalizer, VoxelLevel};
use std::sync::Arc;

/// A density grid held in both its raw and quantized forms.
///
/// The two representations are produced together and never mutated afterwards,
/// so a reader can never observe one without the other. The quantized levels sit
/// behind an `Arc` so they can be handed to a volume timeline without copying.
///
/// Voxels are kept in file order. Cube files loop over the first grid axis
/// outermost and the third innermost, so voxel `(i, j, k)` lives at
/// `k + nz * (j + ny * i)`; see [`voxel_index`].
/// Offset of voxel `[i, j, k]` in a file-ordered grid of `dimensions`, or `None`
/// outside the grid.
pub fn voxel_index(dimensions: [usize; 3], [i, j, k]: [usize; 3]) -> Option<usize> {
    let [nx, ny, nz] = dimensions;
    (i < nx && j < ny && k < nz).then(|| k + nz * (j + ny * i))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DensityField<L: VoxelLevel = u8> {
    raw: Vec<f64>,
    quantized: Arc<[L]>,
}

impl<L: VoxelLevel> DensityField<L> {
    pub fn new(raw: Vec<f64>, normalizer: &DensityNormalizer) -> Self {
        let quantized: Arc<[L]> = normalizer.quantize(&raw).into();
        Self { raw, quantized }
    }

    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    pub fn quantized(&self) -> &[L] {
        &self.quantized
    }

    /// A shared handle to the quantized levels.
    pub fn shared_levels(&self) -> Arc<[L]> {
        Arc::clone(&self.quantized)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Sum of all raw voxel values.
    pub fn total(&self) -> f64 {
        self.raw.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_and_quantized_have_matching_lengths() {
        let field: DensityField = DensityField::new(vec![0.0, 0.1, 0.2, 0.3], &DensityNormalizer::new(0.2));
        assert_eq!(field.len(), 4);
        assert_eq!(field.raw().len(), field.quantized().len());
        assert_eq!(field.quantized(), &[0, 64, 128, 192]);
    }

    #[test]
    fn shared_levels_point_at_the_same_allocation() {
        let field: DensityField = DensityField::new(vec![1.0, 2.0], &DensityNormalizer::disabled());
        let a = field.shared_levels();
        let b = field.shared_levels();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, field.quantized());
    }

    #[test]
    fn voxel_index_runs_third_axis_fastest() {
        let dims = [2, 3, 4];
        assert_eq!(voxel_index(dims, [0, 0, 1]), Some(1));
        assert_eq!(voxel_index(dims, [0, 1, 0]), Some(4));
        assert_eq!(voxel_index(dims, [1, 0, 0]), Some(12));
        assert_eq!(voxel_index(dims, [1, 2, 3]), Some(23));
        assert_eq!(voxel_index(dims, [2, 0, 0]), None);
        assert_eq!(voxel_index(dims, [0, 0, 4]), None);
    }

    #[test]
    fn total_sums_raw_values() {
        let field: DensityField<u16> = DensityField::new(vec![0.5, 0.25, 0.25], &DensityNormalizer::disabled());
        assert_eq!(field.total(), 1.0);
        assert!(!field.is_empty());
    }
}
