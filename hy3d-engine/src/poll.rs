use tokio::task::JoinHandle;

/// Owner of the one background poll task a controller may have.
///
/// Arming always cancels the previous task first, so at most one is alive.
/// Dropping the handle cancels the task.
#[derive(Debug, Default)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, task: JoinHandle<()>) {
        self.cancel();
        self.task = Some(task);
    }

    /// Idempotent. Returns whether a task was still running.
    pub fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                let running = !task.is_finished();
                task.abort();
                running
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn pending_task(dropped: Arc<AtomicBool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let _guard = SetOnDrop(dropped);
            std::future::pending::<()>().await;
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn arming_cancels_previous_task() {
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));

        let mut handle = PollHandle::new();
        handle.arm(pending_task(first.clone()));
        settle().await;
        assert!(handle.is_armed());

        handle.arm(pending_task(second.clone()));
        settle().await;

        assert!(first.load(Ordering::SeqCst));
        assert!(!second.load(Ordering::SeqCst));
        assert!(handle.is_armed());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut handle = PollHandle::new();
        assert!(!handle.cancel());

        handle.arm(pending_task(dropped.clone()));
        settle().await;
        assert!(handle.cancel());
        assert!(!handle.cancel());
        settle().await;

        assert!(dropped.load(Ordering::SeqCst));
        assert!(!handle.is_armed());
    }

    #[tokio::test]
    async fn drop_cancels_task() {
        let dropped = Arc::new(AtomicBool::new(false));
        {
            let mut handle = PollHandle::new();
            handle.arm(pending_task(dropped.clone()));
            settle().await;
        }
        settle().await;
        assert!(dropped.load(Ordering::SeqCst));
    }
}
