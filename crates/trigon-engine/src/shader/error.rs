use std::fmt;
use std::path::PathBuf;

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Failure while building a shader program.
///
/// Every variant is fatal to the application; nothing retries or falls back
/// to another program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read {stage} shader `{}`", .path.display())]
    Read {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `message` is the compiler diagnostic, verbatim.
    #[error("{stage} shader failed to compile:\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("shader program failed to link:\n{message}")]
    Link { message: String },
}

impl ShaderError {
    /// Diagnostic text produced by the compiler or linker, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ShaderError::Read { .. } => None,
            ShaderError::Compile { message, .. } | ShaderError::Link { message } => Some(message),
        }
    }
}
