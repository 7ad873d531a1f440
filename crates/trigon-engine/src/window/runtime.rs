use std::time::Instant;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{AppConfig, AppEvent, Application};
use crate::device::{GpuInit, WgpuBackend};
use crate::shader::ProgramSources;
use crate::time::FramePacer;

/// Entry point for the windowed runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, builds the application and renders until the window
    /// is closed.
    ///
    /// Any initialization failure (window, GPU, shader build) stops the event
    /// loop and is returned here.
    pub fn run(config: AppConfig, gpu_init: GpuInit) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState::new(config, gpu_init);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    app: Application<WgpuBackend<'this>>,
}

struct RuntimeState {
    config: AppConfig,
    gpu_init: GpuInit,
    pacer: FramePacer,

    entry: Option<WindowEntry>,
    error: Option<anyhow::Error>,
    exit_requested: bool,
}

impl RuntimeState {
    fn new(config: AppConfig, gpu_init: GpuInit) -> Self {
        let pacer = FramePacer::new(config.target_fps);
        Self {
            config,
            gpu_init,
            pacer,
            entry: None,
            error: None,
            exit_requested: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.request_exit(event_loop);
    }

    /// Drops the window entry (application teardown, then window) and exits.
    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        if self.entry.take().is_some() {
            log::info!("window closed");
        }
        event_loop.exit();
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.size)
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let config = &self.config;
        let gpu_init = self.gpu_init.clone();

        WindowEntryTryBuilder {
            window,
            app_builder: |w| build_application(w, config, gpu_init),
        }
        .try_build()
    }
}

fn build_application<'w>(
    window: &'w Window,
    config: &AppConfig,
    gpu_init: GpuInit,
) -> Result<Application<WgpuBackend<'w>>> {
    let backend = pollster::block_on(WgpuBackend::new(window, gpu_init))
        .context("GPU initialization failed")?;
    let sources = ProgramSources::load(&config.vertex_shader, &config.fragment_shader)?;
    Application::new(backend, &sources, config.clear_color)
}

/// Maps a window event to the application's input, if it is one.
fn translate_event(event: &WindowEvent) -> Option<AppEvent> {
    match event {
        WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(AppEvent::Quit),
        _ => None,
    }
}

impl ApplicationHandler for RuntimeState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        let Some(entry) = self.entry.as_ref() else {
            return;
        };

        // All pending events have been handled; schedule the next frame.
        if self.pacer.remaining_at(Instant::now()).is_zero() {
            entry.with_window(|w| w.request_redraw());
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.pacer.deadline()));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        if let Some(app_event) = translate_event(&event) {
            let stopped = entry.with_app_mut(|app| {
                app.handle_event(app_event);
                !app.is_running()
            });
            if stopped {
                self.request_exit(event_loop);
            }
            return;
        }

        match event {
            WindowEvent::Resized(new_size) => {
                entry.with_app_mut(|app| app.backend_mut().resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_app_mut(|app| app.backend_mut().resize(new_size));
            }

            WindowEvent::RedrawRequested => {
                let ft = self.pacer.begin_frame();
                if ft.frame_index % 600 == 0 {
                    log::debug!("frame {} (dt {:.4}s)", ft.frame_index, ft.dt);
                }

                if let Err(err) = entry.with_app_mut(|app| app.render_frame()) {
                    self.fail(event_loop, err.context("frame rendering failed"));
                }
            }

            _ => {}
        }
    }
}
