use crate::error::{Error, Result};

/// Write half of a one-shot rendezvous, carried inside a command
#[derive(Debug)]
pub struct Promise<T> {
    tx: flume::Sender<T>,
}

/// Read half of a one-shot rendezvous, kept by the enqueuing stage
#[derive(Debug)]
pub struct CommandFuture<T> {
    rx: flume::Receiver<T>,
}

/// Create a connected promise/future pair
pub fn promise<T>() -> (Promise<T>, CommandFuture<T>) {
    let (tx, rx) = flume::bounded(1);
    (Promise { tx }, CommandFuture { rx })
}

impl<T> Promise<T> {
    /// Hand the result to the waiting stage. A waiter that already gave up
    /// is not an error for the fulfilling stage.
    pub fn fulfill(self, value: T) {
        let _ = self.tx.send(value);
    }
}

impl<T> CommandFuture<T> {
    /// Block until the promise is fulfilled.
    ///
    /// Fails with `StageDisconnected` if the promise was dropped unfulfilled
    /// (the consuming stage exited before running the command).
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| {
            Error::StageDisconnected("promise dropped before being fulfilled".to_string())
        })
    }

    /// Non-blocking poll; `Ok(None)` while the command is still pending
    pub fn try_wait(&self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(flume::TryRecvError::Empty) => Ok(None),
            Err(flume::TryRecvError::Disconnected) => Err(Error::StageDisconnected(
                "promise dropped before being fulfilled".to_string(),
            )),
        }
    }
}
