use std::collections::BTreeMap;

use naga::{Binding, Handle, Interpolation, Module, Sampling, Scalar, ScalarKind, Type, TypeInner};

use super::{ShaderError, ShaderStage};

/// One validated shader stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub source: String,
    pub entry_point: String,
    module: Module,
}

/// Type and interpolation of one `@location` slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Varying {
    pub scalar: Scalar,
    /// `1` for scalars.
    pub components: u8,
    pub interpolation: Option<Interpolation>,
    pub sampling: Option<Sampling>,
}

impl Varying {
    fn new(inner: &TypeInner, binding: &Binding) -> Option<Self> {
        let Binding::Location {
            interpolation,
            sampling,
            ..
        } = *binding
        else {
            return None;
        };
        let (scalar, components) = match *inner {
            TypeInner::Scalar(scalar) => (scalar, 1),
            TypeInner::Vector { size, scalar } => (scalar, u8::from(size)),
            _ => return None,
        };
        Some(Self {
            scalar,
            components,
            interpolation,
            sampling,
        })
    }

    /// Whether a stage reading `self` can consume a value written as `written`.
    ///
    /// The reader may take fewer components, never more, and the scalar kind
    /// must agree.
    fn reads_from(&self, written: &Self) -> bool {
        self.scalar.kind == written.scalar.kind
            && self.scalar.width <= written.scalar.width
            && self.components <= written.components
    }
}

impl CompiledStage {
    /// `@location` slots read by the entry point.
    pub fn inputs(&self) -> BTreeMap<u32, Varying> {
        let mut out = BTreeMap::new();
        if let Some(ep) = self.entry() {
            for arg in &ep.function.arguments {
                collect_locations(&self.module, arg.ty, arg.binding.as_ref(), &mut out);
            }
        }
        out
    }

    /// `@location` slots written by the entry point.
    pub fn outputs(&self) -> BTreeMap<u32, Varying> {
        let mut out = BTreeMap::new();
        if let Some(result) = self.entry().and_then(|ep| ep.function.result.as_ref()) {
            collect_locations(&self.module, result.ty, result.binding.as_ref(), &mut out);
        }
        out
    }

    fn entry(&self) -> Option<&naga::EntryPoint> {
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.name == self.entry_point)
    }
}

/// A vertex + fragment pair known to fit together and to fit `vertex_layout`.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub vertex_layout: wgpu::VertexBufferLayout<'static>,
}

/// Parses and validates one WGSL stage.
///
/// The module must declare exactly one entry point for `stage`. Validation
/// runs without optional capabilities, so a stage that passes here needs
/// nothing beyond the baseline device.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    );
    validator.validate(&module).map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;

    let naga_stage = stage.to_naga();
    let mut entries = module.entry_points.iter().filter(|ep| ep.stage == naga_stage);
    let entry_point = match (entries.next(), entries.next()) {
        (Some(ep), None) => ep.name.clone(),
        (None, _) => {
            return Err(ShaderError::Compile {
                stage,
                message: format!("no @{stage} entry point found"),
            });
        }
        (Some(_), Some(_)) => {
            return Err(ShaderError::Compile {
                stage,
                message: format!("more than one @{stage} entry point found"),
            });
        }
    };

    log::debug!("compiled {stage} shader (entry point `{entry_point}`)");

    Ok(CompiledStage {
        stage,
        source: source.to_owned(),
        entry_point,
        module,
    })
}

/// Checks the stage interfaces against each other and against `layout`.
///
/// - every vertex input must be supplied by an attribute in `layout` whose
///   format has the same scalar kind
/// - every fragment input must be written by the vertex stage with a
///   compatible type and the same interpolation
/// - the fragment stage must write at least one color output
pub fn link(
    vertex: CompiledStage,
    fragment: CompiledStage,
    layout: &wgpu::VertexBufferLayout<'static>,
) -> Result<LinkedProgram, ShaderError> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err(ShaderError::Link {
            message: format!(
                "expected vertex + fragment stages, got {} + {}",
                vertex.stage, fragment.stage
            ),
        });
    }

    let provided: BTreeMap<u32, wgpu::VertexFormat> = layout
        .attributes
        .iter()
        .map(|a| (a.shader_location, a.format))
        .collect();
    let vertex_inputs = vertex.inputs();

    let missing: Vec<u32> = vertex_inputs
        .keys()
        .filter(|loc| !provided.contains_key(loc))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(ShaderError::Link {
            message: format!(
                "vertex entry point `{}` reads @location {:?}, which the vertex layout does not provide",
                vertex.entry_point, missing
            ),
        });
    }
    for (location, input) in &vertex_inputs {
        let format = provided[location];
        let supplied = vertex_format_kind(format);
        if input.scalar.kind != supplied {
            return Err(ShaderError::Link {
                message: format!(
                    "vertex entry point `{}` reads @location({location}) as {:?}, but the vertex layout supplies {format:?}",
                    vertex.entry_point, input.scalar.kind
                ),
            });
        }
    }

    let written = vertex.outputs();
    let fragment_inputs = fragment.inputs();

    let unmatched: Vec<u32> = fragment_inputs
        .keys()
        .filter(|loc| !written.contains_key(loc))
        .copied()
        .collect();
    if !unmatched.is_empty() {
        return Err(ShaderError::Link {
            message: format!(
                "fragment entry point `{}` reads @location {:?}, which `{}` does not write",
                fragment.entry_point, unmatched, vertex.entry_point
            ),
        });
    }
    for (location, input) in &fragment_inputs {
        let output = &written[location];
        if input.interpolation != output.interpolation || input.sampling != output.sampling {
            return Err(ShaderError::Link {
                message: format!(
                    "@location({location}) interpolation differs: `{}` writes {:?}/{:?}, `{}` reads {:?}/{:?}",
                    vertex.entry_point,
                    output.interpolation,
                    output.sampling,
                    fragment.entry_point,
                    input.interpolation,
                    input.sampling
                ),
            });
        }
        if !input.reads_from(output) {
            return Err(ShaderError::Link {
                message: format!(
                    "@location({location}) type mismatch: `{}` writes {}, `{}` reads {}",
                    vertex.entry_point,
                    describe(output),
                    fragment.entry_point,
                    describe(input)
                ),
            });
        }
    }

    if fragment.outputs().is_empty() {
        return Err(ShaderError::Link {
            message: format!(
                "fragment entry point `{}` writes no color output",
                fragment.entry_point
            ),
        });
    }

    Ok(LinkedProgram {
        vertex,
        fragment,
        vertex_layout: layout.clone(),
    })
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, Varying>,
) {
    match binding {
        Some(b @ Binding::Location { location, .. }) => {
            if let Some(varying) = Varying::new(&module.types[ty].inner, b) {
                out.insert(*location, varying);
            }
        }
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

/// Scalar kind a vertex attribute of `format` presents to the shader.
fn vertex_format_kind(format: wgpu::VertexFormat) -> ScalarKind {
    use wgpu::VertexFormat as F;

    match format {
        F::Uint8
        | F::Uint8x2
        | F::Uint8x4
        | F::Uint16
        | F::Uint16x2
        | F::Uint16x4
        | F::Uint32
        | F::Uint32x2
        | F::Uint32x3
        | F::Uint32x4 => ScalarKind::Uint,
        F::Sint8
        | F::Sint8x2
        | F::Sint8x4
        | F::Sint16
        | F::Sint16x2
        | F::Sint16x4
        | F::Sint32
        | F::Sint32x2
        | F::Sint32x3
        | F::Sint32x4 => ScalarKind::Sint,
        _ => ScalarKind::Float,
    }
}

fn describe(v: &Varying) -> String {
    let kind = match v.scalar.kind {
        ScalarKind::Float => "f",
        ScalarKind::Sint => "i",
        ScalarKind::Uint => "u",
        _ => "?",
    };
    let scalar = format!("{kind}{}", u32::from(v.scalar.width) * 8);
    if v.components == 1 {
        scalar
    } else {
        format!("vec{}<{scalar}>", v.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Vertex;
    use crate::shader::fixtures::{FRAGMENT_OK, VERTEX_OK};

    fn compile(stage: ShaderStage, src: &str) -> CompiledStage {
        compile_stage(stage, src).unwrap()
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn valid_vertex_stage_compiles() {
        let vs = compile(ShaderStage::Vertex, VERTEX_OK);
        assert_eq!(vs.entry_point, "vs_main");
        let inputs = vs.inputs();
        assert_eq!(inputs.keys().copied().collect::<Vec<_>>(), [0, 1]);
        assert_eq!(inputs[&0].scalar, Scalar::F32);
        assert_eq!(inputs[&0].components, 3);
        assert_eq!(vs.outputs().keys().copied().collect::<Vec<_>>(), [0]);
    }

    #[test]
    fn syntax_error_reports_compiler_text() {
        let err = compile_stage(ShaderStage::Fragment, "@fragment fn fs_main( {").unwrap_err();
        match &err {
            ShaderError::Compile { stage, message } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert!(!message.trim().is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
        assert!(err.diagnostic().is_some_and(|d| !d.is_empty()));
    }

    #[test]
    fn type_error_is_rejected() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1u; }";
        let err = compile_stage(ShaderStage::Fragment, src).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
    }

    #[test]
    fn validation_error_is_rendered_with_notes() {
        let src = r#"
@fragment
fn fs_main(@builtin(sample_index) i: u32) -> @location(0) vec4<f32> {
    return vec4<f32>(f32(i));
}
"#;
        match compile_stage(ShaderStage::Fragment, src).unwrap_err() {
            ShaderError::Compile { message, .. } => {
                assert!(message.starts_with("error"), "{message}");
                assert!(message.contains("MULTISAMPLED_SHADING"), "{message}");
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_stage_entry_point_is_rejected() {
        let err = compile_stage(ShaderStage::Vertex, FRAGMENT_OK).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile { stage: ShaderStage::Vertex, .. }
        ));
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn matching_stages_link() {
        let vs = compile(ShaderStage::Vertex, VERTEX_OK);
        let fs = compile(ShaderStage::Fragment, FRAGMENT_OK);
        let program = link(vs, fs, &Vertex::LAYOUT).unwrap();
        assert_eq!(program.fragment.entry_point, "fs_main");
        assert_eq!(program.vertex_layout.array_stride, 24);
    }

    #[test]
    fn unmatched_fragment_input_fails_link() {
        let vs = compile(ShaderStage::Vertex, VERTEX_OK);
        let fs = compile(
            ShaderStage::Fragment,
            "@fragment fn fs_main(@location(3) c: vec3<f32>) -> @location(0) vec4<f32> { return vec4<f32>(c, 1.0); }",
        );
        let err = link(vs, fs, &Vertex::LAYOUT).unwrap_err();
        match err {
            ShaderError::Link { message } => assert!(message.contains("[3]")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn vertex_input_outside_layout_fails_link() {
        let src = r#"
@vertex
fn vs_main(@location(5) p: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(p, 1.0);
}
"#;
        let vs = compile(ShaderStage::Vertex, src);
        let fs = compile(
            ShaderStage::Fragment,
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        );
        assert!(matches!(
            link(vs, fs, &Vertex::LAYOUT),
            Err(ShaderError::Link { .. })
        ));
    }

    fn link_message(vertex_src: &str, fragment_src: &str) -> String {
        let vs = compile(ShaderStage::Vertex, vertex_src);
        let fs = compile(ShaderStage::Fragment, fragment_src);
        match link(vs, fs, &Vertex::LAYOUT) {
            Err(ShaderError::Link { message }) => message,
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn wider_fragment_input_fails_link() {
        let message = link_message(
            VERTEX_OK,
            "@fragment fn fs_main(@location(0) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }",
        );
        assert!(message.contains("type mismatch"), "{message}");
        assert!(message.contains("vec3<f32>") && message.contains("vec4<f32>"), "{message}");
    }

    #[test]
    fn narrower_fragment_input_links() {
        let vs = compile(ShaderStage::Vertex, VERTEX_OK);
        let fs = compile(
            ShaderStage::Fragment,
            "@fragment fn fs_main(@location(0) r: f32) -> @location(0) vec4<f32> { return vec4<f32>(r); }",
        );
        assert!(link(vs, fs, &Vertex::LAYOUT).is_ok());
    }

    #[test]
    fn interpolation_mismatch_fails_link() {
        let src = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) @interpolate(flat) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) p: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(p, 1.0);
    out.color = p;
    return out;
}
"#;
        let message = link_message(src, FRAGMENT_OK);
        assert!(message.contains("interpolation"), "{message}");
    }

    #[test]
    fn vertex_input_kind_must_match_layout_format() {
        let src = r#"
@vertex
fn vs_main(@location(0) p: vec3<f32>, @location(1) c: vec4<u32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(p, f32(c.x));
}
"#;
        let message = link_message(
            src,
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        );
        assert!(message.contains("@location(1)"), "{message}");
        assert!(message.contains("Float32x3"), "{message}");
    }

    #[test]
    fn vertex_format_kinds() {
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Float32x3), ScalarKind::Float);
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Unorm8x4), ScalarKind::Float);
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Uint16x2), ScalarKind::Uint);
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Sint32), ScalarKind::Sint);
    }

    #[test]
    fn swapped_stages_fail_link() {
        let vs = compile(ShaderStage::Vertex, VERTEX_OK);
        let fs = compile(ShaderStage::Fragment, FRAGMENT_OK);
        assert!(matches!(
            link(fs, vs, &Vertex::LAYOUT),
            Err(ShaderError::Link { .. })
        ));
    }
}
