//! Static triangle mesh.
//!
//! A [`Mesh`] is one vertex buffer plus one vertex-layout descriptor created
//! on a [`Backend`]. Both are released by [`Mesh::destroy`], which consumes the
//! mesh so it cannot be drawn or destroyed again.

mod vertex;

pub use vertex::{Vertex, TRIANGLE};

use crate::backend::{Backend, BufferHandle, DrawCall, LayoutHandle, ProgramHandle};

/// GPU-side triangle: buffer + layout, fixed vertex count.
#[derive(Debug)]
pub struct Mesh {
    buffer: BufferHandle,
    layout: LayoutHandle,
    vertex_count: u32,
}

impl Mesh {
    /// Uploads [`TRIANGLE`] and declares its layout.
    pub fn triangle<B: Backend + ?Sized>(backend: &mut B) -> Self {
        let buffer = backend.create_buffer("trigon triangle vbo", bytemuck::cast_slice(&TRIANGLE));
        let layout = backend.create_vertex_layout(buffer, &Vertex::LAYOUT);

        log::debug!(
            "triangle mesh created ({} vertices, {} bytes)",
            TRIANGLE.len(),
            std::mem::size_of_val(&TRIANGLE)
        );

        Self {
            buffer,
            layout,
            vertex_count: TRIANGLE.len() as u32,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    #[inline]
    pub fn layout(&self) -> LayoutHandle {
        self.layout
    }

    /// Non-indexed triangle-list draw of every vertex, using `program`.
    pub fn draw_call(&self, program: ProgramHandle) -> DrawCall {
        DrawCall {
            program,
            layout: self.layout,
            vertices: 0..self.vertex_count,
        }
    }

    /// Releases the layout descriptor, then the buffer.
    pub fn destroy<B: Backend + ?Sized>(self, backend: &mut B) {
        backend.destroy_vertex_layout(self.layout);
        backend.destroy_buffer(self.buffer);
        log::debug!("triangle mesh destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn triangle_always_has_three_vertices() {
        let mut backend = HeadlessBackend::new();
        for _ in 0..4 {
            let mesh = Mesh::triangle(&mut backend);
            assert_eq!(mesh.vertex_count(), 3);
            mesh.destroy(&mut backend);
        }
    }

    #[test]
    fn destroy_returns_resource_counts() {
        let mut backend = HeadlessBackend::new();
        let before = (backend.live_buffers(), backend.live_layouts());

        let mesh = Mesh::triangle(&mut backend);
        assert_eq!(backend.live_buffers(), before.0 + 1);
        assert_eq!(backend.live_layouts(), before.1 + 1);
        assert_eq!(backend.buffer_contents(mesh.buffer()).map(<[u8]>::len), Some(72));

        mesh.destroy(&mut backend);
        assert_eq!((backend.live_buffers(), backend.live_layouts()), before);
    }

    #[test]
    fn draw_call_covers_all_vertices() {
        let mut backend = HeadlessBackend::new();
        let mesh = Mesh::triangle(&mut backend);
        let call = mesh.draw_call(ProgramHandle(7));
        assert_eq!(call.vertices, 0..3);
        assert_eq!(call.layout, mesh.layout());
        mesh.destroy(&mut backend);
    }
}
