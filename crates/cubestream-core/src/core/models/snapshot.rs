use super::field::{DensityField, voxel_index};
use crate::core::density::DensityNormalizer;
use crate::core::io::cube::{CubeData, CubeError, CubeFile, CubeReadOptions};
use crate::core::io::traits::SnapshotFile;
use nalgebra::{Point3, Vector3};
use std::path::Path;

/// The immutable state of the simulation at one instant.
///
/// A snapshot is assembled in full (parsing plus quantization) before anyone can
/// see it, and it is never modified afterwards. All lengths are in Bohr.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicSimulationSnapshot {
    atomic_numbers: Vec<u32>,
    atomic_positions: Vec<Point3<f64>>,
    unit_cell_origin: Point3<f64>,
    grid_dimensions: [usize; 3],
    grid_spacings: Vector3<f64>,
    density: DensityField<u8>,
}

impl AtomicSimulationSnapshot {
    /// Quantizes the density of a parsed cube file and freezes the result.
    pub fn assemble(data: CubeData, normalizer: &DensityNormalizer) -> Self {
        let density = DensityField::new(data.density, normalizer);
        Self {
            atomic_numbers: data.atomic_numbers,
            atomic_positions: data.atomic_positions,
            unit_cell_origin: data.origin,
            grid_dimensions: data.grid_dimensions,
            grid_spacings: data.grid_spacings,
            density,
        }
    }

    /// Parses and quantizes the cube file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CubeError`] encountered; no partial snapshot is produced.
    pub fn load<P: AsRef<Path>>(
        path: P,
        options: &CubeReadOptions,
        normalizer: &DensityNormalizer,
    ) -> Result<Self, CubeError> {
        let data = CubeFile::read_from_path(path, options)?;
        Ok(Self::assemble(data, normalizer))
    }

    pub fn number_of_atoms(&self) -> usize {
        self.atomic_positions.len()
    }

    pub fn atomic_numbers(&self) -> &[u32] {
        &self.atomic_numbers
    }

    pub fn atomic_positions(&self) -> &[Point3<f64>] {
        &self.atomic_positions
    }

    pub fn unit_cell_origin(&self) -> Point3<f64> {
        self.unit_cell_origin
    }

    /// Edge lengths of the simulation box: voxel count times spacing per axis.
    pub fn unit_cell_dimensions(&self) -> Vector3<f64> {
        Vector3::new(
            self.grid_dimensions[0] as f64 * self.grid_spacings.x,
            self.grid_dimensions[1] as f64 * self.grid_spacings.y,
            self.grid_dimensions[2] as f64 * self.grid_spacings.z,
        )
    }

    /// The eight corners of the unit cell, relative to the cell origin.
    ///
    /// Corner `i` takes bit 2 for x, bit 1 for y and bit 0 for z.
    pub fn unit_cell_corners(&self) -> [Point3<f64>; 8] {
        let dims = self.unit_cell_dimensions();
        std::array::from_fn(|i| {
            Point3::new(
                dims.x * ((i >> 2) & 1) as f64,
                dims.y * ((i >> 1) & 1) as f64,
                dims.z * (i & 1) as f64,
            )
        })
    }

    pub fn grid_dimensions(&self) -> [usize; 3] {
        self.grid_dimensions
    }

    pub fn grid_spacings(&self) -> Vector3<f64> {
        self.grid_spacings
    }

    pub fn density(&self) -> &DensityField<u8> {
        &self.density
    }

    pub fn density_raw(&self) -> &[f64] {
        self.density.raw()
    }

    pub fn density_quantized(&self) -> &[u8] {
        self.density.quantized()
    }

    /// Raw density at grid point `[i, j, k]` (first, second, third header axis).
    pub fn raw_density_at(&self, point: [usize; 3]) -> Option<f64> {
        voxel_index(self.grid_dimensions, point).map(|index| self.density.raw()[index])
    }
}

/// Fixed volume placement handed to the renderer once, at stream start.
///
/// Lengths are in scene units: source Bohr multiplied by the position scaling
/// factor. Engine-specific offsets are left to the rendering adapter.
///
/// `dimensions` follow the header axes. Frames are in file order with the third
/// axis fastest, so a renderer that expects its first axis fastest must be given
/// the extents reversed (`[nz, ny, nx]`) or swap the x and z axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeGeometry {
    pub dimensions: [usize; 3],
    pub voxel_size: Vector3<f32>,
    pub origin: Point3<f32>,
}

impl VolumeGeometry {
    pub fn from_snapshot(snapshot: &AtomicSimulationSnapshot, scaling_factor: f64) -> Self {
        Self {
            dimensions: snapshot.grid_dimensions(),
            voxel_size: (snapshot.grid_spacings() * scaling_factor).cast::<f32>(),
            origin: (snapshot.unit_cell_origin() * scaling_factor).cast::<f32>(),
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.dimensions.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> CubeData {
        CubeData {
            comments: [String::new(), String::new()],
            origin: Point3::new(1.0, 0.0, -1.0),
            grid_dimensions: [2, 2, 2],
            grid_spacings: Vector3::new(0.5, 1.0, 2.0),
            atomic_numbers: vec![4, 4],
            atomic_positions: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)],
            density: vec![0.0, 0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35],
        }
    }

    #[test]
    fn assemble_keeps_raw_and_quantized_in_sync() {
        let snapshot = AtomicSimulationSnapshot::assemble(sample_data(), &DensityNormalizer::new(0.2));

        assert_eq!(snapshot.number_of_atoms(), 2);
        assert_eq!(snapshot.density_raw().len(), 8);
        assert_eq!(snapshot.density_quantized().len(), 8);
        assert_eq!(snapshot.density_quantized()[4], 128);
        assert_eq!(snapshot.density_quantized()[7], 224);
    }

    #[test]
    fn unit_cell_dimensions_multiply_counts_by_spacings() {
        let snapshot = AtomicSimulationSnapshot::assemble(sample_data(), &DensityNormalizer::disabled());
        assert_eq!(snapshot.unit_cell_dimensions(), Vector3::new(1.0, 2.0, 4.0));
        assert_eq!(snapshot.unit_cell_origin(), Point3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn unit_cell_corners_enumerate_every_vertex() {
        let snapshot = AtomicSimulationSnapshot::assemble(sample_data(), &DensityNormalizer::disabled());
        let corners = snapshot.unit_cell_corners();
        assert_eq!(corners[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[1], Point3::new(0.0, 0.0, 4.0));
        assert_eq!(corners[2], Point3::new(0.0, 2.0, 0.0));
        assert_eq!(corners[4], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(corners[7], Point3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn volume_geometry_scales_spacing_and_origin() {
        let snapshot = AtomicSimulationSnapshot::assemble(sample_data(), &DensityNormalizer::disabled());
        let geometry = VolumeGeometry::from_snapshot(&snapshot, 0.5);
        assert_eq!(geometry.dimensions, [2, 2, 2]);
        assert_eq!(geometry.voxel_size, Vector3::new(0.25, 0.5, 1.0));
        assert_eq!(geometry.origin, Point3::new(0.5, 0.0, -0.5));
        assert_eq!(geometry.voxel_count(), 8);
    }

    #[test]
    fn raw_density_follows_cube_file_axis_order() {
        let text = "\
non-cubic
x outer, z inner
    1    0.0    0.0    0.0
    2    1.0    0.0    0.0
    1    0.0    1.0    0.0
    3    0.0    0.0    1.0
    1    1.0    0.0    0.0    0.0
  0.0 1.0 2.0
  3.0 4.0 5.0
";
        let data = CubeFile::read_from(&mut std::io::Cursor::new(text), &CubeReadOptions::default()).unwrap();
        let snapshot = AtomicSimulationSnapshot::assemble(data, &DensityNormalizer::disabled());

        assert_eq!(snapshot.grid_dimensions(), [2, 1, 3]);
        assert_eq!(snapshot.raw_density_at([0, 0, 2]), Some(2.0));
        assert_eq!(snapshot.raw_density_at([1, 0, 0]), Some(3.0));
        assert_eq!(snapshot.raw_density_at([1, 0, 2]), Some(5.0));
        assert_eq!(snapshot.raw_density_at([0, 1, 0]), None);
    }
}
