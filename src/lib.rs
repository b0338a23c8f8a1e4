//! Library exports for pagesnap.
//!
//! Exposes the capture pipeline, the annotation editor and the configuration
//! types so the binaries and integration tests share one implementation.

pub mod capture;
pub mod config;
pub mod draw;
pub mod editor;
pub mod input;
pub mod notification;
pub mod util;

pub use config::Config;
