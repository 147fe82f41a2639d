//! Job lifecycle for remote 3D generation: submit once, poll until the
//! backend reports a terminal status, publish every state change.

pub mod controller;
pub mod poll;
pub mod session;
pub mod traits;

pub use controller::{ControllerConfig, ControllerEvent, JobController};
pub use session::{JobSnapshot, SessionStatus};
pub use traits::{JobApi, ProgressJitter, RandomJitter};
