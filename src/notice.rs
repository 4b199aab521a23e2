//! Transient success / error messages that clear themselves after a delay.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    notice: Option<Notice>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds at most one message. Setting a new one cancels the previous timer;
/// `clear` and drop cancel the pending timer too, so nothing fires after the
/// owning screen is gone.
#[derive(Debug)]
pub struct Notices {
    delay: Duration,
    slot: Arc<Mutex<Slot>>,
    timer: Option<JoinHandle<()>>,
}

impl Notices {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Arc::new(Mutex::new(Slot::default())),
            timer: None,
        }
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(NoticeKind::Success, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.show(NoticeKind::Error, text.into());
    }

    pub fn current(&self) -> Option<Notice> {
        lock(&self.slot).notice.clone()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Drop the message and any pending timer.
    pub fn clear(&mut self) {
        self.cancel_timer();
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.notice = None;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn show(&mut self, kind: NoticeKind, text: String) {
        self.cancel_timer();
        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.notice = Some(Notice { kind, text });
            slot.generation
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; message will not auto-clear");
            return;
        };
        let slot = Arc::clone(&self.slot);
        let delay = self.delay;
        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut slot = lock(&slot);
            if slot.generation == generation {
                slot.notice = None;
            }
        }));
    }
}

impl Drop for Notices {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
