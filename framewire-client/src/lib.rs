//! # framewire-client
//!
//! TCP client for framewire.
//!
//! This crate provides:
//! - Connect-with-retry and automatic reconnection
//! - The `OK`/`REQUEST`/`HALT` request/response loop
//! - Delivery of decoded frames into a shared [`framewire_queue::FrameQueue`]

pub mod connection;
pub mod error;

pub use connection::{ClientConfig, FrameClient};
pub use error::ClientError;
