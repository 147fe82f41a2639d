pub mod config;
pub mod endpoint;
pub mod error;
pub mod job;
pub mod types;

// Keep the public surface small and intentional.
pub use config::*;
pub use endpoint::*;
pub use error::*;
pub use job::*;
pub use types::*;
