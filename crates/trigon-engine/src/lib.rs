//! Trigon engine crate.
//!
//! One window, one shader program, one triangle. This crate owns the GPU
//! context, the shader builder, the mesh and the render loop; the
//! `trigon-demo` binary only wires them together.

pub mod backend;
pub mod core;
pub mod device;
pub mod logging;
pub mod mesh;
pub mod paint;
pub mod shader;
pub mod time;
pub mod window;
