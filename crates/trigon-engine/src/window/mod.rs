//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to the wgpu backend
//! and the application state machine.

mod runtime;

pub use runtime::Runtime;
