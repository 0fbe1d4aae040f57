//! # framewire-server
//!
//! TCP server for framewire.
//!
//! This crate provides:
//! - An accept loop bounded by a shared halt signal
//! - Per-connection IDLE/DISPATCH/CLOSE request dispatch
//! - Environment-derived configuration

pub mod config;
pub mod error;
pub mod server;

pub use config::Config;
pub use error::ServerError;
pub use server::{FrameServer, ServerStats};
