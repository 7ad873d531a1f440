use anyhow::{Context, Result};

use crate::backend::{Backend, ProgramHandle};
use crate::mesh::{Mesh, Vertex};
use crate::paint::Color;
use crate::shader::ProgramSources;
use crate::time::FramePacer;

use super::event::{AppEvent, EventSource};

/// Lifecycle of an [`Application`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RunState {
    Running,
    Stopped,
}

/// Owns the GPU context, the shader program and the triangle mesh.
///
/// Teardown order is mesh, then program, then the backend itself (dropped
/// with the application). Teardown runs on the first quit or on drop,
/// whichever comes first, and never twice.
pub struct Application<B: Backend> {
    backend: B,
    program: Option<ProgramHandle>,
    mesh: Option<Mesh>,
    clear_color: Color,
    state: RunState,
    frames_rendered: u64,
}

impl<B: Backend> Application<B> {
    /// Builds the shader program and the mesh on `backend`.
    ///
    /// Compile and link failures are returned as [`crate::shader::ShaderError`]
    /// inside the `anyhow` chain.
    pub fn new(backend: B, sources: &ProgramSources, clear_color: Color) -> Result<Self> {
        let linked = sources.build(&Vertex::LAYOUT)?;

        let mut app = Self {
            backend,
            program: None,
            mesh: None,
            clear_color,
            state: RunState::Running,
            frames_rendered: 0,
        };

        // From here on, an early return drops `app`, which releases whatever
        // has already been created.
        let program = app
            .backend
            .create_program(&linked)
            .context("failed to create shader program")?;
        app.program = Some(program);
        app.mesh = Some(Mesh::triangle(&mut app.backend));

        log::info!(
            "application running on {} backend (vertex `{}`, fragment `{}`)",
            app.backend.name(),
            linked.vertex.entry_point,
            linked.fragment.entry_point
        );
        Ok(app)
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Applies one event. A quit while `Running` tears down and stops;
    /// further quits do nothing.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                if self.is_running() {
                    log::info!("quit requested after {} frames", self.frames_rendered);
                    self.shutdown();
                } else {
                    log::debug!("quit ignored; already stopped");
                }
            }
        }
    }

    /// Clears, draws the triangle and presents. Does nothing once stopped.
    ///
    /// A frame the backend asks to skip is not counted.
    pub fn render_frame(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let (Some(program), Some(mesh)) = (self.program, self.mesh.as_ref()) else {
            return Ok(());
        };

        if !self.backend.begin_frame()? {
            log::trace!("frame skipped");
            return Ok(());
        }

        self.backend.clear(self.clear_color);
        self.backend.draw(&mesh.draw_call(program));
        self.backend.present();

        self.frames_rendered += 1;
        Ok(())
    }

    /// Runs until a quit event arrives.
    ///
    /// Each iteration drains `events`, renders one frame and then blocks on
    /// `pacer` until the frame budget has elapsed since the iteration began.
    pub fn run<E>(&mut self, events: &mut E, pacer: &mut FramePacer) -> Result<()>
    where
        E: EventSource + ?Sized,
    {
        while self.is_running() {
            pacer.begin_frame();

            for event in events.drain() {
                self.handle_event(event);
            }
            if !self.is_running() {
                break;
            }

            self.render_frame()?;
            pacer.wait();
        }
        Ok(())
    }

    /// Releases the mesh, then the program, and enters `Stopped`.
    pub fn shutdown(&mut self) {
        let released = self.mesh.is_some() || self.program.is_some();

        if let Some(mesh) = self.mesh.take() {
            mesh.destroy(&mut self.backend);
        }
        if let Some(program) = self.program.take() {
            self.backend.delete_program(program);
        }
        self.state = RunState::Stopped;

        if released {
            log::info!("gpu resources released");
        }
    }
}

impl<B: Backend> Drop for Application<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
