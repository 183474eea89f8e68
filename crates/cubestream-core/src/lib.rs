//! # cubestream
//!
//! Streams a trajectory of volumetric "cube" snapshots (atomic coordinates plus a
//! 3-D electron-density grid) into a bounded, time-indexed buffer that a renderer
//! reads from concurrently.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Immutable snapshot models, the cube-file parser,
//!   density quantization and the cyclic snapshot sequencer. Nothing here owns a
//!   thread or shared state.
//!
//! - **[`engine`]: The Shared State.** Stream configuration, error types, the
//!   atomically swapped snapshot cell, the timepoint buffer retention policy and the
//!   narrow collaborator traits (scene nodes and volume timelines) the renderer
//!   implements.
//!
//! - **[`workflows`]: The Public API.** The streaming session: a background producer
//!   that advances the sequencer, parses, quantizes, publishes and purges until it is
//!   cancelled or a snapshot fails to parse.

pub mod core;
pub mod engine;
pub mod workflows;
