use std::sync::Arc;

use tokio::select;
use tokio::sync::Notify;

/// Cancellation scope for one actor: stopping it aborts the actor's
/// task and runs its exit callback.
#[derive(Clone)]
pub struct Supervisor {
    stop: Arc<Notify>,
}

pub type ExitCallback = Box<dyn FnOnce() + Send>;

impl Supervisor {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(Notify::new()),
        }
    }

    pub fn spawn<T>(&self, task: T, on_exit: Option<ExitCallback>)
    where
        T: std::future::Future + Send + 'static,
    {
        let stop = self.stop.clone();
        tokio::task::spawn(async move {
            select! {
                _ = task => {},
                () = stop.notified() => {},
            }
            if let Some(on_exit) = on_exit {
                on_exit();
            }
        });
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }
}
