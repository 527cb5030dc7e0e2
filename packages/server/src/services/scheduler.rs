use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Cancel handle of a scheduled callback. Dropping it does not cancel.
#[derive(Debug)]
pub struct TimerHandle {
    handle: AbortHandle,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler;

impl Scheduler {
    pub fn new() -> Self {
        Scheduler
    }

    /// Runs `callback(payload)` once after `delay` unless cancelled first.
    pub fn schedule_once<T, F, Fut>(&self, delay: Duration, payload: T, callback: F) -> TimerHandle
    where
        T: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(payload).await;
        });
        TimerHandle {
            handle: task.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_callback_runs_with_payload() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new();

        let handle = scheduler.schedule_once(Duration::from_millis(10), 7u32, move |n| async move {
            tx.send(n).ok();
        });

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(7));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let scheduler = Scheduler::new();

        let handle = scheduler.schedule_once(Duration::from_millis(50), (), move |_| async move {
            tx.send(()).ok();
        });
        handle.cancel();

        // 送信側が破棄されるのでNoneが返る
        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, None);
    }
}
