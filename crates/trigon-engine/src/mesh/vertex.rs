use bytemuck::{Pod, Zeroable};

/// Interleaved per-vertex data: position followed by color.
///
/// Layout (24 bytes):
/// - `position`: 3 × f32 at offset 0, shader location 0
/// - `color`: 3 × f32 at offset 12, shader location 1
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // color
    ];

    /// Vertex-layout descriptor for a buffer of [`Vertex`].
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &Self::ATTRS,
    };

    #[inline]
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

/// The one triangle this crate draws, in NDC.
pub const TRIANGLE: [Vertex; 3] = [
    Vertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0]),
    Vertex::new([0.0, 0.5, 0.0], [0.0, 0.0, 1.0]),
];
