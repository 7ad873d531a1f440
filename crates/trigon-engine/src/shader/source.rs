use std::path::Path;

use super::{compile_stage, link, LinkedProgram, ShaderError, ShaderStage};

/// Vertex and fragment WGSL source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSources {
    pub vertex: String,
    pub fragment: String,
}

impl ProgramSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Reads both stages wholesale as UTF-8.
    ///
    /// A missing or unreadable file is reported as [`ShaderError::Read`],
    /// separate from compiler failures.
    pub fn load(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vertex = read_stage(ShaderStage::Vertex, vertex_path.as_ref())?;
        let fragment = read_stage(ShaderStage::Fragment, fragment_path.as_ref())?;
        Ok(Self { vertex, fragment })
    }

    /// Compiles both stages and links them against `layout`.
    pub fn build(
        &self,
        layout: &wgpu::VertexBufferLayout<'static>,
    ) -> Result<LinkedProgram, ShaderError> {
        let vertex = compile_stage(ShaderStage::Vertex, &self.vertex)?;
        let fragment = compile_stage(ShaderStage::Fragment, &self.fragment)?;
        link(vertex, fragment, layout)
    }
}

fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    log::debug!("reading {stage} shader from {}", path.display());
    std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        stage,
        path: path.to_path_buf(),
        source,
    })
}
