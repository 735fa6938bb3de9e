//! Caller-side cancellation.
//!
//! An [`AbortController`] owns the flag; any number of cloned [`AbortSignal`]s observe it.
//! Dropping the controller without calling [`AbortController::abort`] never cancels.

use tokio::sync::watch;

#[derive(Debug)]
pub struct AbortController {
    sender: watch::Sender<bool>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self { sender }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Fires every signal handed out by this controller. Idempotent.
    pub fn abort(&self) {
        self.sender.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the controller aborts. Pends forever if it never does.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            let aborted = *receiver.borrow_and_update();
            if aborted {
                return;
            }
            if receiver.changed().await.is_err() {
                // Controller dropped without aborting.
                std::future::pending::<()>().await;
            }
        }
    }
}
