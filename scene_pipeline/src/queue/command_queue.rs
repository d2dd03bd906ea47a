use crate::error::{Error, Result};
use super::future::{promise, CommandFuture, Promise};

/// Producer side of a command queue
#[derive(Debug)]
pub struct CommandSender<C> {
    tx: flume::Sender<C>,
}

/// Consumer side of a command queue, owned by exactly one stage
#[derive(Debug)]
pub struct CommandReceiver<C> {
    rx: flume::Receiver<C>,
}

/// Create an unbounded FIFO command queue
pub fn unbounded<C>() -> (CommandSender<C>, CommandReceiver<C>) {
    let (tx, rx) = flume::unbounded();
    (CommandSender { tx }, CommandReceiver { rx })
}

impl<C> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<C> CommandSender<C> {
    /// Push a command without blocking; ownership moves to the consumer.
    pub fn enqueue(&self, command: C) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::StageDisconnected("command queue consumer is gone".to_string()))
    }

    /// Enqueue a command built around a fresh promise and return the future.
    pub fn enqueue_with_future<R, F>(&self, build: F) -> Result<CommandFuture<R>>
    where
        F: FnOnce(Promise<R>) -> C,
    {
        let (promise, future) = promise();
        self.enqueue(build(promise))?;
        Ok(future)
    }

    /// Enqueue a command and block until the consumer fulfills its promise.
    ///
    /// ```ignore
    /// let value = sender.enqueue_and_await(|p| RenderCommand::InitBackend(p))??;
    /// ```
    pub fn enqueue_and_await<R, F>(&self, build: F) -> Result<R>
    where
        F: FnOnce(Promise<R>) -> C,
    {
        self.enqueue_with_future(build)?.wait()
    }

    /// Whether the consumer has dropped its receiver
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_disconnected()
    }
}

impl<C> CommandReceiver<C> {
    /// Block until at least one command is queued, then take every command
    /// currently available in FIFO order.
    ///
    /// Fails with `StageDisconnected` once every sender is gone and the
    /// queue is empty.
    pub fn drain(&self) -> Result<Vec<C>> {
        let first = self
            .rx
            .recv()
            .map_err(|_| Error::StageDisconnected("all command producers are gone".to_string()))?;
        let mut batch = Vec::with_capacity(1 + self.rx.len());
        batch.push(first);
        batch.extend(self.rx.try_iter());
        Ok(batch)
    }

    /// Take every command currently available without blocking
    pub fn try_drain(&self) -> Vec<C> {
        self.rx.try_iter().collect()
    }

    /// Commands waiting to be drained
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
#[path = "command_queue_tests.rs"]
mod tests;
