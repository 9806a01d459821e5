//! Pipeline execution: container lifecycle, timeouts, registry auth and the
//! engine that drives them step by step

pub mod auth;
pub mod container;
pub mod engine;
pub mod supervisor;

pub use auth::{RegistryAuth, RegistrySession};
pub use container::{CommandRunner, ContainerHandle, ContainerManager, FailurePolicy, BUILD_DIR};
pub use engine::{EngineOptions, EventHandler, ExecutionEngine, ExecutionEvent};
pub use supervisor::{Supervised, TimeoutSupervisor};
