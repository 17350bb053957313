// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the [`Executor`] boundary: what an action asks for
//!   ([`SpawnRequest`]) and what it gets back ([`ProcessResult`] or
//!   [`SpawnError`]).
//! - [`local`] is the production executor, built on `tokio::process`.
//! - [`cancel`] carries build-abort requests into in-flight spawns.

pub mod backend;
pub mod cancel;
pub mod local;

pub use backend::{Executor, ProcessResult, SpawnError, SpawnFuture, SpawnRequest};
pub use cancel::{cancellation, CancelHandle, CancelSignal};
pub use local::LocalExecutor;
