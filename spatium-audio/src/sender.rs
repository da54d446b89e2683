//! Dedicated send thread for control-sink commands.
//!
//! Writes are pushed to a bounded channel and a dedicated sender thread
//! drains it into the wrapped sink, keeping process spawns off the tick
//! thread. A full queue drops the write and reports it as a `SinkError`.
//! Writes that fail on the sender thread come back through
//! `drain_failures`, since the caller already saw `Ok` for them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use spatium_types::{ChannelIndex, GraphId};

use crate::backend::{ControlSink, DeferredFailure, SinkError, SinkParam, SinkResult};

/// Channel capacity for the command queue.
/// A 50 ms tick over 8 channels produces at most ~480 writes/sec.
const SEND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SinkCommand {
    Azimuth(ChannelIndex, f32),
    Elevation(ChannelIndex, f32),
    Gain(ChannelIndex, f32),
    Retarget(GraphId),
}

impl SinkCommand {
    fn target(&self) -> Option<(ChannelIndex, SinkParam)> {
        match *self {
            SinkCommand::Azimuth(ch, _) => Some((ch, SinkParam::Azimuth)),
            SinkCommand::Elevation(ch, _) => Some((ch, SinkParam::Elevation)),
            SinkCommand::Gain(ch, _) => Some((ch, SinkParam::Gain)),
            SinkCommand::Retarget(_) => None,
        }
    }
}

pub struct QueuedSink {
    tx: Sender<SinkCommand>,
    failures: Receiver<DeferredFailure>,
    queue_depth: Arc<AtomicUsize>,
    _send_thread: JoinHandle<()>,
}

impl QueuedSink {
    /// Spawn the sender thread that owns `inner`.
    pub fn spawn(inner: Box<dyn ControlSink>) -> std::io::Result<Self> {
        Self::spawn_with_capacity(inner, SEND_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(inner: Box<dyn ControlSink>, capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<SinkCommand>(capacity);
        let (failure_tx, failures) = crossbeam_channel::unbounded::<DeferredFailure>();
        let queue_depth = Arc::new(AtomicUsize::new(0));
        let depth_clone = queue_depth.clone();

        let handle = thread::Builder::new()
            .name("sink-sender".into())
            .spawn(move || {
                sender_loop(inner, rx, failure_tx, depth_clone);
            })?;

        Ok(Self {
            tx,
            failures,
            queue_depth,
            _send_thread: handle,
        })
    }

    /// Commands queued but not yet applied.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    fn push(&self, cmd: SinkCommand) -> SinkResult {
        // Count before sending so the sender's decrement can never underflow.
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(cmd) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(cmd)) => {
                self.queue_depth.fetch_sub(1, Ordering::Relaxed);
                Err(SinkError(format!("command queue full, dropped {:?}", cmd)))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.queue_depth.fetch_sub(1, Ordering::Relaxed);
                Err(SinkError("sink sender thread has exited".to_string()))
            }
        }
    }
}

fn sender_loop(
    inner: Box<dyn ControlSink>,
    rx: Receiver<SinkCommand>,
    failures: Sender<DeferredFailure>,
    queue_depth: Arc<AtomicUsize>,
) {
    while let Ok(cmd) = rx.recv() {
        let result = match cmd {
            SinkCommand::Azimuth(ch, deg) => inner.set_azimuth(ch, deg),
            SinkCommand::Elevation(ch, deg) => inner.set_elevation(ch, deg),
            SinkCommand::Gain(ch, gain) => inner.set_gain(ch, gain),
            SinkCommand::Retarget(node) => inner.retarget(node),
        };
        if let Err(error) = result {
            log::warn!(target: "sink", "{:?} failed: {}", cmd, error);
            if let Some((channel, param)) = cmd.target() {
                // the receiving half only goes away with the QueuedSink itself
                let _ = failures.send(DeferredFailure { channel, param, error });
            }
        }
        // Report before the decrement so an empty queue implies delivered feedback.
        queue_depth.fetch_sub(1, Ordering::Relaxed);
    }
}

impl ControlSink for QueuedSink {
    fn set_azimuth(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.push(SinkCommand::Azimuth(channel, degrees))
    }

    fn set_elevation(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.push(SinkCommand::Elevation(channel, degrees))
    }

    fn set_gain(&self, channel: ChannelIndex, gain: f32) -> SinkResult {
        self.push(SinkCommand::Gain(channel, gain))
    }

    fn retarget(&self, node: GraphId) -> SinkResult {
        self.push(SinkCommand::Retarget(node))
    }

    fn drain_failures(&self) -> Vec<DeferredFailure> {
        self.failures.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SharedTestSink, TestOp, TestSink};
    use std::time::{Duration, Instant};

    fn wait_for_ops(sink: &TestSink, n: usize) -> Vec<TestOp> {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            let ops = sink.operations();
            if ops.len() >= n {
                return ops;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("timed out waiting for {} ops (have {})", n, sink.operations().len());
    }

    #[test]
    fn forwards_in_order() {
        let inner = Arc::new(TestSink::new());
        let queued = QueuedSink::spawn(Box::new(SharedTestSink(Arc::clone(&inner)))).unwrap();
        let ch = ChannelIndex::new(2);
        queued.retarget(GraphId::new(9)).unwrap();
        queued.set_azimuth(ch, 45.0).unwrap();
        queued.set_gain(ch, 0.75).unwrap();

        let ops = wait_for_ops(&inner, 3);
        assert_eq!(
            ops,
            vec![
                TestOp::Retarget(GraphId::new(9)),
                TestOp::SetAzimuth { channel: ch, degrees: 45.0 },
                TestOp::SetGain { channel: ch, gain: 0.75 },
            ]
        );
    }

    fn wait_until_drained(queued: &QueuedSink) {
        let start = Instant::now();
        while queued.queue_depth() > 0 && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn failed_writes_are_reported_back() {
        let inner = Arc::new(TestSink::new());
        let queued = QueuedSink::spawn(Box::new(SharedTestSink(Arc::clone(&inner)))).unwrap();
        let ch = ChannelIndex::new(3);
        inner.set_failing(true);
        queued.retarget(GraphId::new(4)).unwrap();
        queued.set_azimuth(ch, 45.0).unwrap();
        queued.set_gain(ch, 0.5).unwrap();
        wait_until_drained(&queued);

        let failures = queued.drain_failures();
        let params: Vec<(ChannelIndex, SinkParam)> =
            failures.iter().map(|f| (f.channel, f.param)).collect();
        // retarget failures are logged only
        assert_eq!(params, vec![(ch, SinkParam::Azimuth), (ch, SinkParam::Gain)]);
        assert!(queued.drain_failures().is_empty());
    }

    #[test]
    fn inner_failures_do_not_stop_the_thread() {
        let inner = Arc::new(TestSink::new());
        let queued = QueuedSink::spawn(Box::new(SharedTestSink(Arc::clone(&inner)))).unwrap();
        let ch = ChannelIndex::new(1);
        inner.set_failing(true);
        queued.set_elevation(ch, 10.0).unwrap();
        wait_until_drained(&queued);
        inner.set_failing(false);
        queued.set_elevation(ch, 20.0).unwrap();
        wait_for_ops(&inner, 1);
        assert_eq!(inner.elevations(ch), vec![20.0]);
    }
}
