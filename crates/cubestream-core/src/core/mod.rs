//! # Core Module
//!
//! Stateless building blocks of the ingestion pipeline.
//!
//! - **Snapshot models** ([`models`]) - The immutable result of parsing one cube file
//! - **File I/O** ([`io`]) - The cube-format reader and its header dialects
//! - **Density quantization** ([`density`]) - Fixed-precision conversion for volume rendering
//! - **Sequencing** ([`sequence`]) - Cyclic snapshot-index arithmetic and path formatting
//!
//! Every type in this layer is either immutable after construction or plain index
//! arithmetic, so all of it can be tested without threads or files on disk.

pub mod density;
pub mod io;
pub mod models;
pub mod sequence;
