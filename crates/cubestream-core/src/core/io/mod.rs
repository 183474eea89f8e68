//! Provides input functionality for volumetric snapshot file formats.
//!
//! Snapshot readers implement the [`traits::SnapshotFile`] trait, which gives every
//! format the same reader- and path-based entry points. The only format shipped
//! today is the plain-text Gaussian-style cube format in [`cube`], with its two
//! header dialects.

pub mod cube;
pub mod traits;
