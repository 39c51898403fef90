//! Rift Line: scenario-scoped stub engine for line-oriented TCP text protocols.
//!
//! A scenario is a tree of test case directories, each holding response
//! files whose first line is a regex pattern. While a test case is active,
//! every incoming request is matched against its patterns in declaration
//! order and answered with the next response file of the first pattern that
//! matches in full.

pub mod admin_api;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod index;
pub mod metrics;
pub mod render;
pub mod scenario;
pub mod scripting;
pub mod server;
pub mod store;

pub use channel::{DelimitedReader, RequestChannel, ResponseChannel};
pub use config::{Config, DispatchStrategy};
pub use dispatch::{DispatchErrorHook, DispatchFailure, DispatchOutcome};
pub use engine::{EngineSettings, StubEngine};
pub use error::{DispatchError, IndexError, LifecycleError, RenderError};
pub use server::StubServer;
