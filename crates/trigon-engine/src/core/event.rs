/// Input the application reacts to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppEvent {
    /// Window close / quit signal.
    Quit,
}

/// Queue of pending events, drained once at the start of each iteration.
pub trait EventSource {
    /// Returns every event that arrived since the previous call.
    fn drain(&mut self) -> Vec<AppEvent>;
}

impl<F> EventSource for F
where
    F: FnMut() -> Vec<AppEvent>,
{
    fn drain(&mut self) -> Vec<AppEvent> {
        self()
    }
}
