//! Shader program builder.
//!
//! Turns a vertex + fragment WGSL source pair into a [`LinkedProgram`]:
//! - reads both sources from disk (or takes them from memory)
//! - compiles each stage with naga (parse + validate)
//! - links the stages against the vertex layout they will be fed with
//!
//! Backends create their GPU program objects from a `LinkedProgram`, so every
//! backend reports the same compiler diagnostics.

mod compile;
mod error;
mod source;

pub use compile::{compile_stage, link, CompiledStage, LinkedProgram, Varying};
pub use error::{ShaderError, ShaderStage};
pub use source::ProgramSources;
