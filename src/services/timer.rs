use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// At most one pending one-shot timer. Starting replaces any pending timer;
/// cancelling is idempotent. A timer that already fired runs its callback
/// as an independent task, so cancellation cannot abort a callback that is
/// mid-flight, and a firing timer cannot deadlock with the code that
/// scheduled it.
#[derive(Default)]
pub struct TimerManager {
    task: Option<JoinHandle<()>>,
}

impl TimerManager {
    pub fn start<F>(&mut self, after: Duration, on_timeout: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tokio::spawn(on_timeout);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.cancel();
    }
}
