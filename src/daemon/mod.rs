//! Watcher daemon
//!
//! The daemon polls a capture device for beacon frames, runs the compiled
//! extraction script over each one, and keeps per-network fingerprint
//! tables on disk. Configuration, capture, storage, and the core loop
//! live in their own submodules.

pub mod capture;
pub mod config;
pub mod core;
pub mod store;

pub use capture::{CaptureSource, CaptureStats};
pub use config::DaemonConfig;
pub use core::{Daemon, DaemonState, DaemonStats};
pub use store::{FingerprintStore, FingerprintTable};
