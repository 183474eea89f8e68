//! Converts floating-point electron density into fixed-width voxel levels.
//!
//! The renderer uploads volume frames as unsigned integers, so every raw density
//! grid passes through a [`normalizer::DensityNormalizer`] before it is published.
//! The output width is abstracted by [`level::VoxelLevel`]; the rendering path uses
//! `u8`, while `u16` is available for engines that accept wider textures.

pub mod level;
pub mod normalizer;

pub use level::VoxelLevel;
pub use normalizer::DensityNormalizer;
