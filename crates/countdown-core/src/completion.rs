//! End of countdown: play the melody, then let the host quit.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::audio::MelodyPlayer;
use crate::timer::SinkResult;

/// Title used on the fatal-error channel for melody failures.
pub const PLAYBACK_ERROR_TITLE: &str = "Cannot play melody";

#[derive(Debug, Default)]
struct QuitState {
    requested: AtomicBool,
    failed: AtomicBool,
    notify: Notify,
}

/// Host termination signal. Fires at most once; waiters wake when it does.
#[derive(Debug, Clone, Default)]
pub struct QuitSignal {
    inner: Arc<QuitState>,
}

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a normal quit. Returns `false` if a quit was already requested.
    pub fn quit(&self) -> bool {
        let first = !self.inner.requested.swap(true, Ordering::SeqCst);
        if first {
            tracing::info!("quit requested");
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Request a quit after an unrecoverable error.
    pub fn quit_with_failure(&self) -> bool {
        self.inner.failed.store(true, Ordering::SeqCst);
        self.quit()
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> bool {
        self.inner.failed.load(Ordering::SeqCst)
    }

    /// Resolve once quit has been requested.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

type FatalReporter = Rc<dyn Fn(&str, &str)>;

/// Plays the melody and then quits, exactly once, whatever the outcome.
#[derive(Clone)]
pub struct CompletionWorkflow {
    melody: MelodyPlayer,
    melody_path: String,
    quit: QuitSignal,
    report: FatalReporter,
}

impl CompletionWorkflow {
    pub fn new<F>(melody: MelodyPlayer, melody_path: impl Into<String>, quit: QuitSignal, report: F) -> Self
    where
        F: Fn(&str, &str) + 'static,
    {
        Self {
            melody,
            melody_path: melody_path.into(),
            quit,
            report: Rc::new(report),
        }
    }

    /// Run to the end. Playback failures are reported but never prevent the
    /// quit.
    pub async fn finish(self) {
        if let Err(err) = self.melody.play_and_wait(&self.melody_path).await {
            tracing::error!(error = %err, path = %self.melody_path, "completion melody failed");
            (self.report)(PLAYBACK_ERROR_TITLE, &err.to_string());
        }
        self.quit.quit();
    }

    /// Turn the workflow into an engine completion sink. The sink spawns
    /// `finish` on the current `LocalSet`; calls after the first do nothing.
    ///
    /// # Panics
    /// The sink panics if it is called outside a `LocalSet`, since it uses
    /// `tokio::task::spawn_local`.
    pub fn into_sink(self) -> impl FnMut() -> SinkResult + 'static {
        let mut pending = Some(self);
        move || {
            if let Some(workflow) = pending.take() {
                tokio::task::spawn_local(workflow.finish());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::ScriptedBackend;
    use std::cell::RefCell;
    use std::io::Write;

    #[tokio::test]
    async fn quit_fires_once() {
        let quit = QuitSignal::new();
        assert!(quit.quit());
        assert!(!quit.quit());
        assert!(!quit.failed());
        quit.wait().await;
    }

    #[tokio::test]
    async fn waiters_wake_on_quit() {
        let quit = QuitSignal::new();
        let waiter = {
            let quit = quit.clone();
            tokio::spawn(async move { quit.wait().await })
        };
        tokio::task::yield_now().await;
        quit.quit_with_failure();
        waiter.await.unwrap();
        assert!(quit.failed());
    }

    #[tokio::test(start_paused = true)]
    async fn quits_after_melody() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"tune").unwrap();
        let backend = Rc::new(RefCell::new(ScriptedBackend::playing_for(3)));
        let quit = QuitSignal::new();
        let reports = Rc::new(RefCell::new(Vec::<String>::new()));

        let r = reports.clone();
        let workflow = CompletionWorkflow::new(
            MelodyPlayer::new(backend.clone()),
            file.path().to_str().unwrap(),
            quit.clone(),
            move |_, message| r.borrow_mut().push(message.to_string()),
        );
        workflow.finish().await;

        assert!(quit.is_requested());
        assert!(reports.borrow().is_empty());
        assert_eq!(backend.borrow().played.len(), 1);
    }

    #[tokio::test]
    async fn quits_even_when_melody_is_missing() {
        let quit = QuitSignal::new();
        let reports = Rc::new(RefCell::new(Vec::<(String, String)>::new()));

        let r = reports.clone();
        let workflow = CompletionWorkflow::new(
            MelodyPlayer::new(Rc::new(RefCell::new(ScriptedBackend::default()))),
            "",
            quit.clone(),
            move |title, message| r.borrow_mut().push((title.into(), message.into())),
        );
        workflow.finish().await;

        assert!(quit.is_requested());
        let reports = reports.borrow();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, PLAYBACK_ERROR_TITLE);
    }

    #[tokio::test]
    async fn sink_spawns_workflow_once() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let quit = QuitSignal::new();
                let reports = Rc::new(RefCell::new(0u32));
                let r = reports.clone();
                let mut sink = CompletionWorkflow::new(
                    MelodyPlayer::new(Rc::new(RefCell::new(ScriptedBackend::default()))),
                    "",
                    quit.clone(),
                    move |_, _| *r.borrow_mut() += 1,
                )
                .into_sink();

                sink().unwrap();
                sink().unwrap();
                quit.wait().await;
                tokio::task::yield_now().await;
                assert_eq!(*reports.borrow(), 1);
            })
            .await;
    }

    #[tokio::test]
    #[should_panic(expected = "LocalSet")]
    async fn sink_needs_a_local_set() {
        let mut sink = CompletionWorkflow::new(
            MelodyPlayer::new(Rc::new(RefCell::new(ScriptedBackend::default()))),
            "",
            QuitSignal::new(),
            |_, _| {},
        )
        .into_sink();
        let _ = sink();
    }
}
