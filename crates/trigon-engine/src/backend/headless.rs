//! Backend without a GPU.
//!
//! Used by tests and display-less runs. Shader programs still go through the
//! full naga compile + link in [`crate::shader`], so diagnostics match the
//! wgpu backend.

use std::ops::Range;

use crate::paint::Color;
use crate::shader::{LinkedProgram, ShaderError};

use super::{Backend, BufferHandle, DrawCall, LayoutHandle, ProgramHandle, ResourceTable};

/// A command issued inside an acquired frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameCommand {
    Clear(Color),
    Draw {
        program: ProgramHandle,
        layout: LayoutHandle,
        vertices: Range<u32>,
    },
    Present,
}

#[derive(Debug)]
struct HeadlessProgram {
    vertex_entry: String,
    fragment_entry: String,
}

#[derive(Debug)]
struct HeadlessLayout {
    buffer: BufferHandle,
    array_stride: u64,
}

/// Records resources and frame commands in memory.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    programs: ResourceTable<HeadlessProgram>,
    buffers: ResourceTable<Vec<u8>>,
    layouts: ResourceTable<HeadlessLayout>,
    commands: Vec<FrameCommand>,
    in_frame: bool,
    frames_presented: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_layouts(&self) -> usize {
        self.layouts.len()
    }

    /// Sum of all live resources.
    pub fn live_resources(&self) -> usize {
        self.live_programs() + self.live_buffers() + self.live_layouts()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Bytes uploaded to `buffer`, if it is still alive.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer.0).map(Vec::as_slice)
    }

    /// Entry point names `(vertex, fragment)` of a live program.
    pub fn program_entry_points(&self, program: ProgramHandle) -> Option<(&str, &str)> {
        self.programs
            .get(program.0)
            .map(|p| (p.vertex_entry.as_str(), p.fragment_entry.as_str()))
    }

    /// Every frame command recorded so far, in issue order.
    pub fn commands(&self) -> &[FrameCommand] {
        &self.commands
    }

    fn record(&mut self, cmd: FrameCommand) {
        if !self.in_frame {
            log::warn!("headless: {cmd:?} issued outside a frame; ignored");
            return;
        }
        self.commands.push(cmd);
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_program(&mut self, program: &LinkedProgram) -> Result<ProgramHandle, ShaderError> {
        let id = self.programs.insert(HeadlessProgram {
            vertex_entry: program.vertex.entry_point.clone(),
            fragment_entry: program.fragment.entry_point.clone(),
        });
        log::trace!("headless: created program {id}");
        Ok(ProgramHandle(id))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program.0).is_none() {
            log::warn!("headless: delete of unknown program {program:?}");
        }
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> BufferHandle {
        let id = self.buffers.insert(contents.to_vec());
        log::trace!("headless: created buffer {id} `{label}` ({} bytes)", contents.len());
        BufferHandle(id)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(buffer.0).is_none() {
            log::warn!("headless: destroy of unknown buffer {buffer:?}");
        }
    }

    fn create_vertex_layout(
        &mut self,
        buffer: BufferHandle,
        layout: &wgpu::VertexBufferLayout<'static>,
    ) -> LayoutHandle {
        let id = self.layouts.insert(HeadlessLayout {
            buffer,
            array_stride: layout.array_stride,
        });
        LayoutHandle(id)
    }

    fn destroy_vertex_layout(&mut self, layout: LayoutHandle) {
        if self.layouts.remove(layout.0).is_none() {
            log::warn!("headless: destroy of unknown layout {layout:?}");
        }
    }

    fn begin_frame(&mut self) -> anyhow::Result<bool> {
        if self.in_frame {
            log::warn!("headless: begin_frame while a frame is open; previous frame dropped");
        }
        self.in_frame = true;
        Ok(true)
    }

    fn clear(&mut self, color: Color) {
        self.record(FrameCommand::Clear(color));
    }

    fn draw(&mut self, call: &DrawCall) {
        if self.programs.get(call.program.0).is_none() {
            log::warn!("headless: draw with unknown program {:?}", call.program);
            return;
        }
        let Some(layout) = self.layouts.get(call.layout.0) else {
            log::warn!("headless: draw with unknown layout {:?}", call.layout);
            return;
        };
        let Some(contents) = self.buffers.get(layout.buffer.0) else {
            log::warn!("headless: layout {:?} refers to a destroyed buffer", call.layout);
            return;
        };

        let needed = u64::from(call.vertices.end) * layout.array_stride;
        let have = contents.len() as u64;
        if needed > have {
            log::warn!("headless: draw reads {needed} bytes from a {have}-byte buffer");
            return;
        }

        self.record(FrameCommand::Draw {
            program: call.program,
            layout: call.layout,
            vertices: call.vertices.clone(),
        });
    }

    fn present(&mut self) {
        self.record(FrameCommand::Present);
        if self.in_frame {
            self.in_frame = false;
            self.frames_presented += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Vertex, TRIANGLE};
    use crate::shader::fixtures;

    #[test]
    fn program_lifecycle_is_counted() {
        let mut backend = HeadlessBackend::new();
        let linked = fixtures::sources().build(&Vertex::LAYOUT).unwrap();

        let program = backend.create_program(&linked).unwrap();
        assert_eq!(backend.live_programs(), 1);
        assert_eq!(backend.program_entry_points(program), Some(("vs_main", "fs_main")));

        backend.delete_program(program);
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn commands_outside_frame_are_dropped() {
        let mut backend = HeadlessBackend::new();
        backend.clear(Color::BLACK);
        backend.present();
        assert!(backend.commands().is_empty());
        assert_eq!(backend.frames_presented(), 0);
    }

    #[test]
    fn frame_records_in_order() {
        let mut backend = HeadlessBackend::new();
        assert!(backend.begin_frame().unwrap());
        backend.clear(Color::BLACK);
        backend.present();

        assert_eq!(
            backend.commands(),
            &[FrameCommand::Clear(Color::BLACK), FrameCommand::Present]
        );
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn draws_the_backend_cannot_honor_are_skipped() {
        let mut backend = HeadlessBackend::new();
        let linked = fixtures::sources().build(&Vertex::LAYOUT).unwrap();
        let program = backend.create_program(&linked).unwrap();
        let buffer = backend.create_buffer("one vertex", bytemuck::bytes_of(&TRIANGLE[0]));
        let layout = backend.create_vertex_layout(buffer, &Vertex::LAYOUT);

        backend.begin_frame().unwrap();
        backend.draw(&DrawCall {
            program,
            layout,
            vertices: 0..3,
        });
        backend.draw(&DrawCall {
            program: ProgramHandle(999),
            layout,
            vertices: 0..1,
        });
        backend.draw(&DrawCall {
            program,
            layout,
            vertices: 0..1,
        });
        backend.present();

        assert_eq!(
            backend.commands(),
            &[
                FrameCommand::Draw {
                    program,
                    layout,
                    vertices: 0..1
                },
                FrameCommand::Present,
            ]
        );
    }
}
