/// Frame held by [`super::WgpuBackend`] between `begin_frame` and `present`.
///
/// Clear and draw passes are recorded into `encoder`, targeting `view`.
/// `present` submits the encoder and presents `surface_texture`; until then no
/// further surface texture can be acquired.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
