//! Asynchronous shader creation.
//!
//! Shader creation is two-phase: source loading/validation runs on a
//! background thread, while GPU-side finalization (module + pipeline
//! creation) must happen on the frame thread. [`ShaderTask`] models this as
//! an explicit handle the frame loop polls; there is no detached task whose
//! lifetime outlives the renderer, and the channel hand-off provides the
//! acquire/release edge between the two threads.

use std::sync::mpsc;

use crate::backend::PrimitiveKind;

/// Errors from shader loading or compilation.
#[derive(Debug, Clone)]
pub enum ShaderError {
    /// Reading or preprocessing the source failed.
    LoadFailed(String),

    /// GPU-side compilation/linking failed.
    CompileFailed(String),

    /// The background loader disappeared without delivering a result.
    TaskDisconnected,
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderError::LoadFailed(msg) => write!(f, "Failed to load shader source: {}", msg),
            ShaderError::CompileFailed(msg) => write!(f, "Failed to compile shader: {}", msg),
            ShaderError::TaskDisconnected => {
                write!(f, "Shader loader thread exited without a result")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// Shader source text, loaded and ready for frame-thread finalization.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub label: String,
    pub code: String,
}

/// Result of polling a [`ShaderTask`].
pub enum ShaderPoll<S> {
    /// The background load has not finished yet.
    Pending,
    /// Finalization completed; the shader is ready to use.
    Ready(S),
    /// Loading or finalization failed. The task is spent.
    Failed(ShaderError),
}

type Finalize<S> = Box<dyn FnOnce(ShaderSource) -> Result<S, ShaderError>>;

/// Handle to an in-flight shader creation.
///
/// Owned and polled by the frame loop; `poll` runs the finalize step on the
/// calling thread once the loaded source arrives.
pub struct ShaderTask<S> {
    rx: mpsc::Receiver<Result<ShaderSource, ShaderError>>,
    finalize: Option<Finalize<S>>,
    // True when a spawned loader thread owns the sender and will always
    // deliver a result. Channel-backed tasks have no such guarantee, so
    // `wait` must not block on them.
    thread_backed: bool,
}

impl<S> ShaderTask<S> {
    /// Spawn a loader thread and return the handle.
    pub fn spawn(
        load: impl FnOnce() -> Result<ShaderSource, ShaderError> + Send + 'static,
        finalize: impl FnOnce(ShaderSource) -> Result<S, ShaderError> + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            // A dropped receiver just means the renderer shut down first.
            let _ = tx.send(load());
        });
        Self {
            rx,
            finalize: Some(Box::new(finalize)),
            thread_backed: true,
        }
    }

    /// Build a task from an externally controlled channel. Used by test
    /// backends to keep a shader pending until the test releases it.
    pub fn from_channel(
        rx: mpsc::Receiver<Result<ShaderSource, ShaderError>>,
        finalize: impl FnOnce(ShaderSource) -> Result<S, ShaderError> + 'static,
    ) -> Self {
        Self {
            rx,
            finalize: Some(Box::new(finalize)),
            thread_backed: false,
        }
    }

    /// Poll without blocking. `Ready`/`Failed` are terminal; the caller is
    /// expected to drop the task afterwards.
    pub fn poll(&mut self) -> ShaderPoll<S> {
        match self.rx.try_recv() {
            Ok(result) => self.complete(result),
            Err(mpsc::TryRecvError::Empty) => ShaderPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                ShaderPoll::Failed(ShaderError::TaskDisconnected)
            }
        }
    }

    /// Block until the background load finishes, then finalize. Used on the
    /// shutdown path so no loader thread outlives the renderer's resources.
    ///
    /// Blocking is only safe for spawned tasks. A channel-backed task's
    /// sender may never deliver (and may be owned by the renderer's own
    /// backend, which drops after this call), so it gets a single poll.
    pub fn wait(mut self) -> ShaderPoll<S> {
        if !self.thread_backed {
            return self.poll();
        }
        match self.rx.recv() {
            Ok(result) => self.complete(result),
            Err(mpsc::RecvError) => ShaderPoll::Failed(ShaderError::TaskDisconnected),
        }
    }

    fn complete(&mut self, result: Result<ShaderSource, ShaderError>) -> ShaderPoll<S> {
        let source = match result {
            Ok(source) => source,
            Err(e) => return ShaderPoll::Failed(e),
        };
        match self.finalize.take() {
            Some(finalize) => match finalize(source) {
                Ok(shader) => ShaderPoll::Ready(shader),
                Err(e) => ShaderPoll::Failed(e),
            },
            // Polled again after a terminal state.
            None => ShaderPoll::Failed(ShaderError::TaskDisconnected),
        }
    }
}

/// One of the renderer's four shader stages: the resolved shader plus an
/// optional in-flight replacement.
///
/// On reload the previous shader stays usable until the new compile lands,
/// so a hot reload never blanks a frame.
pub struct ShaderSlot<S> {
    kind: PrimitiveKind,
    current: Option<S>,
    pending: Option<ShaderTask<S>>,
}

impl<S> ShaderSlot<S> {
    pub fn loading(kind: PrimitiveKind, task: ShaderTask<S>) -> Self {
        Self {
            kind,
            current: None,
            pending: Some(task),
        }
    }

    /// Advance the in-flight task, swapping in the new shader when ready.
    pub fn poll(&mut self) {
        let Some(task) = &mut self.pending else {
            return;
        };
        match task.poll() {
            ShaderPoll::Pending => {}
            ShaderPoll::Ready(shader) => {
                tracing::debug!("{} shader ready", self.kind);
                self.current = Some(shader);
                self.pending = None;
            }
            ShaderPoll::Failed(e) => {
                tracing::error!("{} shader failed to load: {}", self.kind, e);
                self.pending = None;
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    pub fn get(&self) -> Option<&S> {
        self.current.as_ref()
    }

    /// Queue a replacement compile. The current shader keeps serving frames
    /// until the replacement finishes.
    pub fn reload(&mut self, task: ShaderTask<S>) {
        if self.pending.is_some() {
            tracing::warn!("{} shader reload superseded an in-flight compile", self.kind);
        }
        self.pending = Some(task);
    }

    /// Block on any outstanding compile. Called at renderer shutdown so the
    /// loader thread cannot outlive backend resources.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.pending.take() {
            let _ = task.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ShaderSource {
        ShaderSource {
            label: "test".to_string(),
            code: String::new(),
        }
    }

    #[test]
    fn task_stays_pending_until_the_source_arrives() {
        let (tx, rx) = mpsc::channel();
        let mut task = ShaderTask::from_channel(rx, |_| Ok(42_u32));

        assert!(matches!(task.poll(), ShaderPoll::Pending));
        tx.send(Ok(source())).unwrap();
        assert!(matches!(task.poll(), ShaderPoll::Ready(42)));
    }

    #[test]
    fn load_failure_is_terminal() {
        let (tx, rx) = mpsc::channel();
        let mut task = ShaderTask::from_channel(rx, |_| Ok(42_u32));

        tx.send(Err(ShaderError::LoadFailed("missing".to_string())))
            .unwrap();
        assert!(matches!(
            task.poll(),
            ShaderPoll::Failed(ShaderError::LoadFailed(_))
        ));
    }

    #[test]
    fn dropped_sender_reports_disconnection() {
        let (tx, rx) = mpsc::channel::<Result<ShaderSource, ShaderError>>();
        drop(tx);
        let mut task = ShaderTask::from_channel(rx, |_| Ok(0_u32));
        assert!(matches!(
            task.poll(),
            ShaderPoll::Failed(ShaderError::TaskDisconnected)
        ));
    }

    #[test]
    fn wait_does_not_block_on_an_external_channel() {
        let (tx, rx) = mpsc::channel::<Result<ShaderSource, ShaderError>>();
        let task = ShaderTask::from_channel(rx, |_| Ok(0_u32));
        // The sender is alive but silent; wait must return, not hang.
        assert!(matches!(task.wait(), ShaderPoll::Pending));
        drop(tx);
    }

    #[test]
    fn shutdown_returns_with_an_undelivered_external_load() {
        let (tx, rx) = mpsc::channel();
        let mut slot = ShaderSlot::loading(
            PrimitiveKind::Circle,
            ShaderTask::from_channel(rx, |_| Ok(3_u32)),
        );
        slot.shutdown();
        assert!(!slot.is_ready());
        drop(tx);
    }

    #[test]
    fn spawn_runs_the_loader_off_thread() {
        let task = ShaderTask::spawn(|| Ok(source()), |s| Ok(s.label));
        match task.wait() {
            ShaderPoll::Ready(label) => assert_eq!(label, "test"),
            _ => panic!("expected the spawned load to complete"),
        }
    }

    #[test]
    fn slot_keeps_current_shader_through_a_reload() {
        let (tx, rx) = mpsc::channel();
        let mut slot = ShaderSlot::loading(
            PrimitiveKind::Quad,
            ShaderTask::from_channel(rx, |_| Ok(1_u32)),
        );
        tx.send(Ok(source())).unwrap();
        slot.poll();
        assert_eq!(slot.get(), Some(&1));

        let (tx2, rx2) = mpsc::channel();
        slot.reload(ShaderTask::from_channel(rx2, |_| Ok(2_u32)));
        slot.poll();
        // Replacement still pending: the old shader keeps serving.
        assert!(slot.is_ready());
        assert_eq!(slot.get(), Some(&1));

        tx2.send(Ok(source())).unwrap();
        slot.poll();
        assert_eq!(slot.get(), Some(&2));
    }

    #[test]
    fn failed_reload_keeps_the_old_shader() {
        let (tx, rx) = mpsc::channel();
        let mut slot = ShaderSlot::loading(
            PrimitiveKind::Text,
            ShaderTask::from_channel(rx, |_| Ok(7_u32)),
        );
        tx.send(Ok(source())).unwrap();
        slot.poll();

        let (tx2, rx2) = mpsc::channel();
        slot.reload(ShaderTask::from_channel(rx2, |_| Ok(8_u32)));
        tx2.send(Err(ShaderError::CompileFailed("bad wgsl".to_string())))
            .unwrap();
        slot.poll();
        assert_eq!(slot.get(), Some(&7));
    }
}
