use std::path::PathBuf;

use winit::dpi::LogicalSize;

use crate::paint::Color;

/// Window, clear color, pacing and shader locations.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub size: LogicalSize<f64>,
    pub clear_color: Color,
    /// Frame cap; `0` renders as fast as the present mode allows.
    pub target_fps: u32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "trigon".to_string(),
            size: LogicalSize::new(640.0, 480.0),
            clear_color: Color::rgb(0.1, 0.2, 0.2),
            target_fps: 60,
            vertex_shader: PathBuf::from("shaders/vertex.wgsl"),
            fragment_shader: PathBuf::from("shaders/fragment.wgsl"),
        }
    }
}
