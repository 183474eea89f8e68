//! Long-running pipelines built from the core and engine layers.
//!
//! [`stream`] drives the producer loop: it walks a snapshot sequence, parses and
//! quantizes each file, and hands the result to the scene and volume
//! collaborators while consumers read the last published frame.

pub mod stream;
