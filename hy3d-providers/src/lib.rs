//! Remote API adapter for the Hunyuan 3D job API.
//!
//! Builds `/submit` and `/query` requests, executes them, and folds the
//! backend's response dialects into the canonical shapes from `hy3d-core`.

pub mod client;
pub mod hunyuan;
pub mod parse;
pub mod request;
pub mod runtime;

pub use client::HunyuanClient;
