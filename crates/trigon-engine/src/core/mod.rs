//! Application state machine.
//!
//! [`Application`] owns a backend, the shader program and the triangle mesh,
//! and moves from `Running` to `Stopped` exactly once. The winit runtime in
//! [`crate::window`] and the headless [`Application::run`] loop drive the same
//! state machine.

mod app;
mod config;
mod event;

pub use app::{Application, RunState};
pub use config::AppConfig;
pub use event::{AppEvent, EventSource};
