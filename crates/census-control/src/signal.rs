//! One-shot completion signals.
//!
//! A [`CompletionTrigger`] fires at most once; every [`CompletionSignal`]
//! subscribed to it observes the firing, including signals created after it.

use thiserror::Error;
use tokio::sync::watch;

/// The trigger was dropped without firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("completion trigger dropped before firing")]
pub struct SignalDropped;

/// Create a trigger and a first signal for it.
pub fn completion_pair() -> (CompletionTrigger, CompletionSignal) {
    let (tx, rx) = watch::channel(false);
    (CompletionTrigger { tx }, CompletionSignal { rx })
}

/// Firing side of a completion signal.
#[derive(Debug)]
pub struct CompletionTrigger {
    tx: watch::Sender<bool>,
}

impl CompletionTrigger {
    /// Fire the signal. Returns `false` if it had already fired.
    pub fn fire(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Another signal for this trigger.
    pub fn subscribe(&self) -> CompletionSignal {
        CompletionSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Waiting side of a completion signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    rx: watch::Receiver<bool>,
}

impl CompletionSignal {
    /// Whether the trigger has fired.
    pub fn is_complete(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the trigger fires.
    ///
    /// There is no built-in deadline; wrap the call in `tokio::time::timeout`
    /// when a signal that never fires must be treated as a failure.
    pub async fn wait(&self) -> Result<(), SignalDropped> {
        let mut rx = self.rx.clone();
        rx.wait_for(|fired| *fired)
            .await
            .map(|_| ())
            .map_err(|_| SignalDropped)
    }
}
