//! Wiring between persisted settings, the HTTP adapter and the job controller.

pub mod api;
pub mod config_store;
pub mod defaults;
pub mod image_input;
pub mod runtime_engine;

pub use config_store::{ConfigStore, Settings};
pub use runtime_engine::build_controller;
