use tokio::sync::watch::Receiver;
use tokio::task::JoinHandle;
use tracing::trace;

/// Handle to a registered listener.
///
/// The listener keeps firing until the handle is dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a subscription unregisters its listener"]
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Subscription { handle }
    }

    pub fn unsubscribe(self) {
        // Drop aborts the listener task
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Calls `listener` with every value published after registration.
///
/// Values published faster than the listener runs are coalesced, the listener always sees the latest one.
pub(crate) fn listen<T, F>(mut rx: Receiver<T>, mut listener: F) -> Subscription
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(T) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            listener(value);
        }
        trace!("Publisher dropped, listener finished");
    });

    Subscription::new(handle)
}

/// Like [`listen`], but skips values equal to the last one the listener saw.
///
/// The value present at registration counts as seen, so a coalesced `A -> B -> A` burst does not fire.
pub(crate) fn listen_changes<T, F>(rx: Receiver<T>, mut listener: F) -> Subscription
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: FnMut(T) + Send + 'static,
{
    let mut last = rx.borrow().clone();
    listen(rx, move |value: T| {
        if value != last {
            last = value.clone();
            listener(value);
        }
    })
}
