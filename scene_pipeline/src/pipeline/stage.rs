/// Stage threads.
///
/// A stage owns one CommandReceiver and one handler. Its loop blocks until
/// commands are queued, hands the whole batch to the handler in FIFO order,
/// and exits after a command asks it to (or once every producer is gone).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crate::error::Result;
use crate::pipeline_err;
use crate::queue::CommandReceiver;

const LOG_SOURCE: &str = "pipeline3d::Stage";

/// What the stage loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageControl {
    Continue,
    Exit,
}

/// Owner of a stage's state, fed one command at a time
pub trait CommandHandler: Send + 'static {
    type Command: Send + 'static;

    fn handle(&mut self, command: Self::Command) -> StageControl;

    /// Called once on the stage thread after the loop ends
    fn on_exit(&mut self) {}
}

// ===== STATISTICS =====

/// Counters updated by a stage thread, readable from any thread
#[derive(Debug, Default)]
pub struct StageStatistics {
    batches: AtomicU64,
    commands: AtomicU64,
    work_nanos: AtomicU64,
    wait_nanos: AtomicU64,
}

/// Snapshot of a stage's statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageReport {
    pub batches: u64,
    pub commands: u64,
    /// Time spent handling commands
    pub work_time: Duration,
    /// Time spent blocked on an empty queue
    pub wait_time: Duration,
}

impl StageReport {
    pub fn average_batch_size(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.commands as f64 / self.batches as f64
        }
    }

    pub fn average_work_time(&self) -> Duration {
        self.per_batch(self.work_time)
    }

    pub fn average_wait_time(&self) -> Duration {
        self.per_batch(self.wait_time)
    }

    fn per_batch(&self, total: Duration) -> Duration {
        match u32::try_from(self.batches) {
            Ok(0) => Duration::ZERO,
            Ok(batches) => total / batches,
            Err(_) => Duration::from_nanos((total.as_nanos() / self.batches as u128) as u64),
        }
    }
}

impl StageStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_wait(&self, waited: Duration) {
        self.wait_nanos.fetch_add(duration_nanos(waited), Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, commands: usize, worked: Duration) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.commands.fetch_add(commands as u64, Ordering::Relaxed);
        self.work_nanos.fetch_add(duration_nanos(worked), Ordering::Relaxed);
    }

    pub fn report(&self) -> StageReport {
        StageReport {
            batches: self.batches.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            work_time: Duration::from_nanos(self.work_nanos.load(Ordering::Relaxed)),
            wait_time: Duration::from_nanos(self.wait_nanos.load(Ordering::Relaxed)),
        }
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

// ===== STAGE LOOP =====

/// Drain and handle batches until the handler exits or the queue closes
pub fn run_stage<H: CommandHandler>(
    name: &str,
    handler: &mut H,
    receiver: &CommandReceiver<H::Command>,
    statistics: &StageStatistics,
) {
    crate::pipeline_info!(LOG_SOURCE, "Stage '{}' started", name);
    loop {
        let wait_start = Instant::now();
        let batch = match receiver.drain() {
            Ok(batch) => batch,
            Err(_) => {
                crate::pipeline_info!(LOG_SOURCE, "Stage '{}': every producer is gone", name);
                break;
            }
        };
        statistics.record_wait(wait_start.elapsed());

        let work_start = Instant::now();
        let mut handled = 0;
        let mut skipped = 0;
        let mut exit = false;
        for command in batch {
            if exit {
                skipped += 1;
                continue;
            }
            handled += 1;
            exit = handler.handle(command) == StageControl::Exit;
        }
        statistics.record_batch(handled, work_start.elapsed());

        if exit {
            skipped += receiver.len();
            if skipped > 0 {
                crate::pipeline_warn!(LOG_SOURCE,
                    "Stage '{}' exiting with {} commands queued after shutdown", name, skipped);
            }
            break;
        }
    }
    handler.on_exit();
    crate::pipeline_info!(LOG_SOURCE, "Stage '{}' stopped", name);
}

/// Spawn a named thread running `run_stage`
pub(crate) fn spawn_stage<H: CommandHandler>(
    name: &str,
    mut handler: H,
    receiver: CommandReceiver<H::Command>,
    statistics: Arc<StageStatistics>,
) -> Result<JoinHandle<()>> {
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || run_stage(&thread_name, &mut handler, &receiver, &statistics))
        .map_err(|e| pipeline_err!(InitializationFailed, LOG_SOURCE,
            "cannot spawn stage thread '{}': {}", name, e))
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
