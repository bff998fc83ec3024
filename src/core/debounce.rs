//! Input debouncing for the URL field

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Emits the latest submitted value once input has been quiet for `delay`.
///
/// Every submission restarts the timer. Each emission runs the handler on its
/// own task, so a slow handler never holds back the next value.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F, Fut>(delay: Duration, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(mut pending) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(value) => pending = value,
                            None => return,
                        },
                        _ = tokio::time::sleep(delay) => {
                            tokio::spawn(handler(pending));
                            break;
                        }
                    }
                }
            }
            debug!("Debouncer input closed");
        });

        Self { tx, task }
    }

    /// Queue a value. Returns false once the debouncer has stopped.
    pub fn submit(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
