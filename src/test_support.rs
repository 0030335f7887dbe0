//! Helpers shared by unit tests across modules.

use std::{collections::HashMap, sync::{Arc, Mutex}};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{layer::{Context, SubscriberExt}, Layer};

/// A tracing layer that counts warning-level events per target.
#[derive(Clone, Default)]
pub(crate) struct WarningCounter {
    counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl WarningCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with this counter installed as the current thread's subscriber.
    pub(crate) fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }

    /// The number of warnings logged to the given target so far.
    pub(crate) fn count(&self, target: &str) -> usize {
        self.counts.lock().unwrap().get(target).copied().unwrap_or(0)
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            *self.counts.lock().unwrap()
                .entry(event.metadata().target().to_string())
                .or_insert(0) += 1;
        }
    }
}
