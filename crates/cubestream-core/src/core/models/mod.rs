//! # Snapshot Models
//!
//! Data structures describing one instant of a simulation trajectory.
//!
//! - [`snapshot`] - The fully assembled [`snapshot::AtomicSimulationSnapshot`] and the
//!   renderer-facing [`snapshot::VolumeGeometry`]
//! - [`field`] - The paired raw/quantized density field
//!
//! A snapshot is rebuilt from scratch for every parsed file; nothing in here is
//! mutated after construction.

pub mod field;
pub mod snapshot;
