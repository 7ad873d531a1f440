use std::path::{Path, PathBuf};

use trigon_engine::backend::{FrameCommand, HeadlessBackend};
use trigon_engine::core::{AppConfig, AppEvent, Application, RunState};
use trigon_engine::shader::{ProgramSources, ShaderError, ShaderStage};
use trigon_engine::time::FramePacer;

fn workspace_path(relative: &Path) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

fn shipped_sources() -> ProgramSources {
    let config = AppConfig::default();
    ProgramSources::load(
        workspace_path(&config.vertex_shader),
        workspace_path(&config.fragment_shader),
    )
    .unwrap()
}

fn start() -> Application<HeadlessBackend> {
    let config = AppConfig::default();
    Application::new(HeadlessBackend::new(), &shipped_sources(), config.clear_color).unwrap()
}

#[test]
fn shipped_shaders_build() {
    let app = start();
    assert!(app.is_running());
    assert_eq!(app.backend().live_programs(), 1);

    let program = app.program().unwrap();
    assert_eq!(
        app.backend().program_entry_points(program),
        Some(("vs_main", "fs_main"))
    );
}

#[test]
fn quit_before_first_frame() {
    let mut app = start();
    let mut events = || vec![AppEvent::Quit];

    app.run(&mut events, &mut FramePacer::uncapped()).unwrap();

    assert_eq!(app.state(), RunState::Stopped);
    assert_eq!(app.frames_rendered(), 0);
    assert_eq!(app.backend().live_resources(), 0);
    assert!(app.backend().commands().is_empty());
}

#[test]
fn five_iterations_issue_five_frames() {
    const N: usize = 5;

    let mut app = start();
    let mut polled = 0;
    let mut events = || {
        polled += 1;
        if polled > N { vec![AppEvent::Quit] } else { Vec::new() }
    };

    app.run(&mut events, &mut FramePacer::uncapped()).unwrap();

    let commands = app.backend().commands();
    assert_eq!(commands.len(), N * 3);
    for frame in commands.chunks(3) {
        assert!(matches!(frame[0], FrameCommand::Clear(_)));
        assert!(matches!(
            &frame[1],
            FrameCommand::Draw { vertices, .. } if *vertices == (0..3)
        ));
        assert_eq!(frame[2], FrameCommand::Present);
    }
    assert_eq!(app.backend().frames_presented(), N as u64);
    assert_eq!(app.backend().live_resources(), 0);
}

#[test]
fn paced_run_takes_at_least_budget_per_frame() {
    let mut app = start();
    let mut polled = 0;
    let mut events = || {
        polled += 1;
        if polled > 3 { vec![AppEvent::Quit] } else { Vec::new() }
    };

    let started = std::time::Instant::now();
    app.run(&mut events, &mut FramePacer::new(60)).unwrap();

    assert_eq!(app.frames_rendered(), 3);
    assert!(started.elapsed() >= FramePacer::new(60).budget() * 3);
}

#[test]
fn multiple_quits_in_one_iteration() {
    let mut app = start();
    let mut events = || vec![AppEvent::Quit, AppEvent::Quit, AppEvent::Quit];

    app.run(&mut events, &mut FramePacer::uncapped()).unwrap();

    assert_eq!(app.state(), RunState::Stopped);
    assert_eq!(app.backend().live_resources(), 0);
}

#[test]
fn broken_fragment_shader_is_fatal() {
    let sources = ProgramSources::new(
        shipped_sources().vertex,
        "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0) }",
    );
    let err = Application::new(HeadlessBackend::new(), &sources, Default::default())
        .err()
        .expect("missing semicolon must not compile");

    match err.downcast_ref::<ShaderError>() {
        Some(ShaderError::Compile { stage, message }) => {
            assert_eq!(*stage, ShaderStage::Fragment);
            assert!(!message.is_empty());
        }
        other => panic!("expected fragment compile error, got {other:?}"),
    }
}

#[test]
fn missing_shader_file_is_read_error() {
    let err = ProgramSources::load("no/such/vertex.wgsl", "no/such/fragment.wgsl").unwrap_err();
    assert!(matches!(
        err,
        ShaderError::Read { stage: ShaderStage::Vertex, .. }
    ));
}
