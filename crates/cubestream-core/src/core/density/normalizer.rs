use super::level::VoxelLevel;
use rayon::prelude::*;

/// Maps raw density values onto voxel levels.
///
/// A raw value equal to the normalization target lands on the mid-scale level of
/// the output type; everything else scales linearly from zero and saturates at the
/// maximum level. Negative and NaN inputs map to zero.
///
/// A target of zero (or any non-positive or non-finite target) disables
/// normalization: raw values are scaled by `1.0` and then rounded and clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityNormalizer {
    normalize_to: f64,
}

impl Default for DensityNormalizer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl DensityNormalizer {
    pub fn new(normalize_to: f64) -> Self {
        Self { normalize_to }
    }

    pub fn disabled() -> Self {
        Self { normalize_to: 0.0 }
    }

    pub fn normalize_to(&self) -> f64 {
        self.normalize_to
    }

    pub fn is_enabled(&self) -> bool {
        self.normalize_to.is_finite() && self.normalize_to > 0.0
    }

    /// The multiplier applied to every raw value before rounding.
    pub fn scale_for<L: VoxelLevel>(&self) -> f64 {
        if self.is_enabled() {
            L::MID_LEVEL / self.normalize_to
        } else {
            1.0
        }
    }

    #[inline]
    pub fn quantize_value<L: VoxelLevel>(&self, raw: f64) -> L {
        quantize_scaled(raw, self.scale_for::<L>())
    }

    /// Quantizes a whole density grid, preserving voxel order.
    pub fn quantize<L: VoxelLevel>(&self, raw: &[f64]) -> Vec<L> {
        let scale = self.scale_for::<L>();
        raw.par_iter()
            .map(|&value| quantize_scaled(value, scale))
            .collect()
    }
}

#[inline]
fn quantize_scaled<L: VoxelLevel>(raw: f64, scale: f64) -> L {
    let scaled = raw * scale;
    // `!(x > 0.0)` also catches NaN.
    if !(scaled > 0.0) {
        return L::default();
    }
    L::from_level(scaled.round().min(L::MAX_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_value_maps_to_mid_scale() {
        let normalizer = DensityNormalizer::new(0.2);
        assert_eq!(normalizer.quantize_value::<u8>(0.2), 128);
        assert_eq!(normalizer.quantize_value::<u8>(0.1), 64);
        assert_eq!(normalizer.quantize_value::<u8>(0.0), 0);
    }

    #[test]
    fn values_above_range_saturate_instead_of_wrapping() {
        let normalizer = DensityNormalizer::new(0.2);
        assert_eq!(normalizer.quantize_value::<u8>(0.4), 255);
        assert_eq!(normalizer.quantize_value::<u8>(1.0e6), 255);
        assert_eq!(normalizer.quantize_value::<u8>(f64::INFINITY), 255);
    }

    #[test]
    fn negative_and_nan_values_map_to_zero() {
        let normalizer = DensityNormalizer::new(0.2);
        assert_eq!(normalizer.quantize_value::<u8>(-0.5), 0);
        assert_eq!(normalizer.quantize_value::<u8>(f64::NAN), 0);
    }

    #[test]
    fn zero_target_scales_by_one() {
        let normalizer = DensityNormalizer::new(0.0);
        assert!(!normalizer.is_enabled());
        assert_eq!(normalizer.scale_for::<u8>(), 1.0);
        assert_eq!(normalizer.quantize_value::<u8>(0.4), 0);
        assert_eq!(normalizer.quantize_value::<u8>(3.6), 4);
        assert_eq!(normalizer.quantize_value::<u8>(300.0), 255);

        let raw = [0.0, 1.2, 7.5, 254.6, 1.0e9];
        let first: Vec<u8> = normalizer.quantize(&raw);
        let second: Vec<u8> = normalizer.quantize(&raw);
        assert_eq!(first, vec![0, 1, 8, 255, 255]);
        assert_eq!(first, second);
    }

    #[test]
    fn non_finite_target_falls_back_to_unit_scale() {
        assert_eq!(DensityNormalizer::new(f64::NAN).scale_for::<u8>(), 1.0);
        assert_eq!(DensityNormalizer::new(-1.0).scale_for::<u8>(), 1.0);
    }

    #[test]
    fn quantization_is_monotonic_and_bounded() {
        let normalizer = DensityNormalizer::new(0.05);
        let raw: Vec<f64> = (0..2000).map(|i| i as f64 * 1.0e-4).collect();
        let levels: Vec<u8> = normalizer.quantize(&raw);

        assert_eq!(levels.len(), raw.len());
        for pair in levels.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(*levels.first().unwrap(), 0);
        assert_eq!(*levels.last().unwrap(), 255);
    }

    #[test]
    fn wide_levels_use_their_own_mid_scale() {
        let normalizer = DensityNormalizer::new(0.2);
        assert_eq!(normalizer.quantize_value::<u16>(0.2), 32768);
        assert_eq!(normalizer.quantize_value::<u16>(0.5), u16::MAX);
    }

    #[test]
    fn bulk_quantization_matches_per_value_quantization() {
        let normalizer = DensityNormalizer::new(0.3);
        let raw = [0.01, 0.3, 0.15, 0.0, 0.59, 0.61];
        let bulk: Vec<u8> = normalizer.quantize(&raw);
        let single: Vec<u8> = raw.iter().map(|&v| normalizer.quantize_value(v)).collect();
        assert_eq!(bulk, single);
    }
}
