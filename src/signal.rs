//! A coalescing wake-up signal for the UI thread.
//!
//! Background tasks push their results into lock-free queues and then
//! raise this signal; the UI loop waits on the receiving end and drains
//! all pending queues whenever it fires.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// The sending half of the UI signal. Cheap to clone and `Send`.
#[derive(Clone, Debug)]
pub struct UiSignal {
    sender: Sender<()>,
}

impl UiSignal {
    /// Creates a new signal and the receiver that the UI loop should wait on.
    pub fn new() -> (Self, Receiver<()>) {
        // A capacity of one is enough: multiple signals raised before the UI
        // thread wakes up collapse into a single wake-up.
        let (sender, receiver) = crossbeam_channel::bounded(1);
        (Self { sender }, receiver)
    }

    /// Tells the UI thread that there are pending updates to process.
    pub fn set_ui_signal(&self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => { }
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!(target: "ui", "UI signal raised after the UI loop exited");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_coalesce() {
        let (signal, receiver) = UiSignal::new();
        signal.set_ui_signal();
        signal.set_ui_signal();
        signal.clone().set_ui_signal();

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_signal_after_receiver_dropped() {
        let (signal, receiver) = UiSignal::new();
        drop(receiver);
        // Must not panic.
        signal.set_ui_signal();
    }
}
