/// An unsigned integer type that quantized density voxels can be stored in.
///
/// Implementors define the saturation ceiling and the mid-scale level that the
/// configured normalization target maps onto.
pub trait VoxelLevel: Copy + Default + PartialOrd + Send + Sync + 'static {
    /// The largest representable level, as a float.
    const MAX_LEVEL: f64;
    /// The level that the normalization target maps onto.
    const MID_LEVEL: f64;

    /// Converts an already rounded, clamped level into the storage type.
    ///
    /// Callers guarantee `0.0 <= level <= Self::MAX_LEVEL`.
    fn from_level(level: f64) -> Self;
}

impl VoxelLevel for u8 {
    const MAX_LEVEL: f64 = u8::MAX as f64;
    const MID_LEVEL: f64 = 128.0;

    #[inline]
    fn from_level(level: f64) -> Self {
        level as u8
    }
}

impl VoxelLevel for u16 {
    const MAX_LEVEL: f64 = u16::MAX as f64;
    const MID_LEVEL: f64 = 32768.0;

    #[inline]
    fn from_level(level: f64) -> Self {
        level as u16
    }
}
