//! Explicit GPU context seam.
//!
//! Every GPU call goes through a [`Backend`] receiver, and every resource is
//! named by a typed handle. Nothing relies on a "currently bound" program or
//! buffer: a draw names its program and vertex layout in [`DrawCall`].
//!
//! Implementations:
//! - [`crate::device::WgpuBackend`]: wgpu device + window surface
//! - [`HeadlessBackend`]: no GPU; counts resources and records frames

mod headless;
mod table;

use std::ops::Range;

pub use headless::{FrameCommand, HeadlessBackend};
pub(crate) use table::ResourceTable;

use crate::paint::Color;
use crate::shader::{LinkedProgram, ShaderError};

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Handle to a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a vertex-layout descriptor bound to one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutHandle(pub(crate) u64);

/// One non-indexed triangle-list draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub layout: LayoutHandle,
    pub vertices: Range<u32>,
}

/// GPU context used by [`crate::mesh::Mesh`] and [`crate::core::Application`].
///
/// Frame protocol: `begin_frame`, then any number of `clear` / `draw`, then
/// `present`. `clear`, `draw` and `present` outside an acquired frame are
/// ignored with a warning.
pub trait Backend {
    /// Short human-readable backend name for logs.
    fn name(&self) -> &'static str;

    fn create_program(&mut self, program: &LinkedProgram) -> Result<ProgramHandle, ShaderError>;
    fn delete_program(&mut self, program: ProgramHandle);

    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> BufferHandle;
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn create_vertex_layout(
        &mut self,
        buffer: BufferHandle,
        layout: &wgpu::VertexBufferLayout<'static>,
    ) -> LayoutHandle;
    fn destroy_vertex_layout(&mut self, layout: LayoutHandle);

    /// Acquires the next frame.
    ///
    /// `Ok(false)` means the frame should be skipped (transient surface state).
    /// `Err` is unrecoverable.
    fn begin_frame(&mut self) -> anyhow::Result<bool>;

    fn clear(&mut self, color: Color);
    fn draw(&mut self, call: &DrawCall);
    fn present(&mut self);
}
