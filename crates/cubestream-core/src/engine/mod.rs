//! # Engine Module
//!
//! Shared state and contracts between the snapshot producer and the renderer.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Stream parameters, defaults, validation and TOML loading
//! - **Error Handling** ([`error`]) - Session-level errors raised by the streaming loop
//! - **Publication** ([`publish`]) - Atomically swapped, immutable snapshot handles
//! - **Volume Timeline** ([`timeline`]) - The append/select/purge contract and the bounded
//!   [`timeline::TimepointBuffer`] that implements it
//! - **Scene Binding** ([`scene`]) - Index-aligned atom-to-node position updates
//! - **Cancellation** ([`cancel`]) - Cooperative stop signal for the producer thread
//! - **Progress Monitoring** ([`progress`]) - Optional per-frame event callbacks

pub mod cancel;
pub mod config;
pub mod error;
pub mod progress;
pub mod publish;
pub mod scene;
pub mod timeline;
