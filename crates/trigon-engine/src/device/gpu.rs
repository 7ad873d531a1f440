use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::{Backend, BufferHandle, DrawCall, LayoutHandle, ProgramHandle, ResourceTable};
use crate::paint::Color;
use crate::shader::{LinkedProgram, ShaderError};

use super::surface;
use super::{GpuFrame, GpuInit};

/// Vertex layout descriptor: which buffer feeds slot 0, and how.
struct VertexLayoutBinding {
    buffer: BufferHandle,
    layout: wgpu::VertexBufferLayout<'static>,
}

/// wgpu-backed [`Backend`] bound to one window.
///
/// - creates and stores Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - owns every program (render pipeline), buffer and layout it hands out
pub struct WgpuBackend<'w> {
    window: &'w Window,

    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; the window must outlive the backend.
    surface: wgpu::Surface<'w>,

    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    programs: ResourceTable<wgpu::RenderPipeline>,
    buffers: ResourceTable<wgpu::Buffer>,
    layouts: ResourceTable<VertexLayoutBinding>,

    /// Frame between `begin_frame` and `present`.
    frame: Option<GpuFrame>,
}

impl<'w> WgpuBackend<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("trigon device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface::choose_alpha_mode(&surface_caps, alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!(
            "gpu ready: {} ({:?}), surface {:?} {}x{}",
            info.name,
            info.backend,
            format,
            size.width,
            size.height
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            programs: ResourceTable::default(),
            buffers: ResourceTable::default(),
            layouts: ResourceTable::default(),
            frame: None,
        })
    }

    /// Reconfigures the surface after a resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }
}

impl Backend for WgpuBackend<'_> {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_program(&mut self, program: &LinkedProgram) -> Result<ProgramHandle, ShaderError> {
        // Anything the device rejects lands in this scope instead of the
        // uncaptured-error handler.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trigon vertex shader"),
            source: wgpu::ShaderSource::Wgsl(program.vertex.source.as_str().into()),
        });
        let fragment_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trigon fragment shader"),
            source: wgpu::ShaderSource::Wgsl(program.fragment.source.as_str().into()),
        });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trigon pipeline layout"),
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("trigon pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(program.vertex.entry_point.as_str()),
                    compilation_options: Default::default(),
                    buffers: &[program.vertex_layout.clone()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some(program.fragment.entry_point.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        // Stage modules are no longer needed once the pipeline exists.
        drop(vertex_module);
        drop(fragment_module);

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(pipeline_error(&err));
        }

        let id = self.programs.insert(pipeline);
        log::debug!("wgpu: created program {id}");
        Ok(ProgramHandle(id))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program.0).is_none() {
            log::warn!("wgpu: delete of unknown program {program:?}");
        }
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> BufferHandle {
        use wgpu::util::DeviceExt;

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        BufferHandle(self.buffers.insert(buffer))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.remove(buffer.0) {
            Some(b) => b.destroy(),
            None => log::warn!("wgpu: destroy of unknown buffer {buffer:?}"),
        }
    }

    fn create_vertex_layout(
        &mut self,
        buffer: BufferHandle,
        layout: &wgpu::VertexBufferLayout<'static>,
    ) -> LayoutHandle {
        LayoutHandle(self.layouts.insert(VertexLayoutBinding {
            buffer,
            layout: layout.clone(),
        }))
    }

    fn destroy_vertex_layout(&mut self, layout: LayoutHandle) {
        if self.layouts.remove(layout.0).is_none() {
            log::warn!("wgpu: destroy of unknown layout {layout:?}");
        }
    }

    fn begin_frame(&mut self) -> Result<bool> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(false);
        }
        if self.frame.take().is_some() {
            log::warn!("wgpu: begin_frame while a frame is open; previous frame dropped");
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                let action = surface::recover_surface_error(
                    &self.surface,
                    &self.device,
                    &self.config,
                    self.size,
                    &err,
                );
                log::debug!("wgpu: surface error {err:?} -> {action:?}");
                if action.is_fatal() {
                    return Err(err).context("failed to acquire surface texture");
                }
                return Ok(false);
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trigon frame encoder"),
            });

        self.frame = Some(GpuFrame {
            surface_texture,
            view,
            encoder,
        });
        Ok(true)
    }

    fn clear(&mut self, color: Color) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("wgpu: clear outside a frame; ignored");
            return;
        };

        let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trigon clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn draw(&mut self, call: &DrawCall) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("wgpu: draw outside a frame; ignored");
            return;
        };
        let Some(pipeline) = self.programs.get(call.program.0) else {
            log::warn!("wgpu: draw with unknown program {:?}", call.program);
            return;
        };
        let Some(binding) = self.layouts.get(call.layout.0) else {
            log::warn!("wgpu: draw with unknown layout {:?}", call.layout);
            return;
        };
        let Some(buffer) = self.buffers.get(binding.buffer.0) else {
            log::warn!("wgpu: layout {:?} refers to a destroyed buffer", call.layout);
            return;
        };

        let byte_len = u64::from(call.vertices.end) * binding.layout.array_stride;
        if byte_len > buffer.size() {
            log::warn!("wgpu: draw reads {byte_len} bytes from a {}-byte buffer", buffer.size());
            return;
        }

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trigon draw"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, buffer.slice(..byte_len));
        rpass.draw(call.vertices.clone(), 0..1);
    }

    fn present(&mut self) {
        let Some(GpuFrame {
            surface_texture,
            view,
            encoder,
        }) = self.frame.take()
        else {
            log::warn!("wgpu: present outside a frame; ignored");
            return;
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        self.window.pre_present_notify();
        surface_texture.present();
    }
}

/// Maps an error captured while building a pipeline to a link failure.
fn pipeline_error(err: &wgpu::Error) -> ShaderError {
    let mut message = err.to_string();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    ShaderError::Link { message }
}
