//! Mirra Gateway - Remote collection API client
//!
//! Implements the core's gateway contract over the remote addon
//! collection HTTP API, including the wire codec.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod http;
pub mod wire;

pub use http::HttpGateway;
