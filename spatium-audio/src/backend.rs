//! Control sink trait: a semantic-level abstraction over parameter writes.
//!
//! `ControlSink` captures what the dispatcher *means* to do (point channel 3
//! at 90°, set its gain) independently of how it's done (`pw-cli`, a queue,
//! a recording for tests). Every call may fail; failures are reported to the
//! caller and never retried here.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use spatium_types::{ChannelIndex, GraphId};

/// Result type for sink operations.
pub type SinkResult<T = ()> = Result<T, SinkError>;

/// Error from a sink operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError(e.to_string())
    }
}

impl From<String> for SinkError {
    fn from(s: String) -> Self {
        SinkError(s)
    }
}

/// Accepts per-channel parameter writes for the spatializer node.
pub trait ControlSink: Send {
    /// Point a channel at `degrees` azimuth (0° = front, clockwise).
    fn set_azimuth(&self, channel: ChannelIndex, degrees: f32) -> SinkResult;

    /// Set a channel's elevation in degrees.
    fn set_elevation(&self, channel: ChannelIndex, degrees: f32) -> SinkResult;

    /// Set a channel's linear mix gain.
    fn set_gain(&self, channel: ChannelIndex, gain: f32) -> SinkResult;

    /// Direct subsequent writes at a (re)resolved node.
    fn retarget(&self, _node: GraphId) -> SinkResult {
        Ok(())
    }

    /// Writes that returned `Ok` when submitted but failed afterwards.
    /// Sinks that complete writes before returning have none.
    fn drain_failures(&self) -> Vec<DeferredFailure> {
        Vec::new()
    }
}

/// The per-channel parameter a write targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkParam {
    Azimuth,
    Elevation,
    Gain,
}

/// An accepted write that later failed on its way to the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredFailure {
    pub channel: ChannelIndex,
    pub param: SinkParam,
    pub error: SinkError,
}

/// Parameter name templates on the spatializer node. `{ch}` is replaced by
/// the 1-based channel number.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamNames {
    pub azimuth: String,
    pub elevation: String,
    /// Every mix parameter that carries a channel's gain (left and right bus).
    pub gain: Vec<String>,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            azimuth: "spk{ch}:Azimuth".to_string(),
            elevation: "spk{ch}:Elevation".to_string(),
            gain: vec!["mixL:Gain {ch}".to_string(), "mixR:Gain {ch}".to_string()],
        }
    }
}

impl ParamNames {
    pub fn azimuth_for(&self, channel: ChannelIndex) -> String {
        render(&self.azimuth, channel)
    }

    pub fn elevation_for(&self, channel: ChannelIndex) -> String {
        render(&self.elevation, channel)
    }

    pub fn gain_for(&self, channel: ChannelIndex) -> Vec<String> {
        self.gain.iter().map(|t| render(t, channel)).collect()
    }
}

fn render(template: &str, channel: ChannelIndex) -> String {
    template.replace("{ch}", &channel.to_string())
}

// ─── Test doubles ───────────────────────────────────────────────────

/// An operation recorded by `TestSink` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    SetAzimuth { channel: ChannelIndex, degrees: f32 },
    SetElevation { channel: ChannelIndex, degrees: f32 },
    SetGain { channel: ChannelIndex, gain: f32 },
    Retarget(GraphId),
}

/// A sink that records every successful operation. Can be switched into a
/// failing mode to exercise error paths; failed calls are not recorded.
pub struct TestSink {
    ops: Mutex<Vec<TestOp>>,
    failing: AtomicBool,
}

impl TestSink {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Clear recorded operations.
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    /// Azimuth writes for one channel, oldest first.
    pub fn azimuths(&self, channel: ChannelIndex) -> Vec<f32> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::SetAzimuth { channel: ch, degrees } if *ch == channel => Some(*degrees),
                _ => None,
            })
            .collect()
    }

    /// Gain writes for one channel, oldest first.
    pub fn gains(&self, channel: ChannelIndex) -> Vec<f32> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::SetGain { channel: ch, gain } if *ch == channel => Some(*gain),
                _ => None,
            })
            .collect()
    }

    /// Elevation writes for one channel, oldest first.
    pub fn elevations(&self, channel: ChannelIndex) -> Vec<f32> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::SetElevation { channel: ch, degrees } if *ch == channel => Some(*degrees),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: TestOp) -> SinkResult {
        if self.failing.load(Ordering::Relaxed) {
            return Err(SinkError(format!("injected failure for {:?}", op)));
        }
        self.ops.lock().unwrap().push(op);
        Ok(())
    }
}

impl ControlSink for TestSink {
    fn set_azimuth(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.record(TestOp::SetAzimuth { channel, degrees })
    }

    fn set_elevation(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.record(TestOp::SetElevation { channel, degrees })
    }

    fn set_gain(&self, channel: ChannelIndex, gain: f32) -> SinkResult {
        self.record(TestOp::SetGain { channel, gain })
    }

    fn retarget(&self, node: GraphId) -> SinkResult {
        self.record(TestOp::Retarget(node))
    }
}

impl Default for TestSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps `Arc<TestSink>` so the engine can own a `Box<dyn ControlSink>`
/// while tests retain an `Arc` for assertions.
pub struct SharedTestSink(pub Arc<TestSink>);

impl ControlSink for SharedTestSink {
    fn set_azimuth(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.0.set_azimuth(channel, degrees)
    }
    fn set_elevation(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.0.set_elevation(channel, degrees)
    }
    fn set_gain(&self, channel: ChannelIndex, gain: f32) -> SinkResult {
        self.0.set_gain(channel, gain)
    }
    fn retarget(&self, node: GraphId) -> SinkResult {
        self.0.retarget(node)
    }
}

// ─── NullSink ───────────────────────────────────────────────────────

/// A sink that only logs. Used for dry runs when no graph should be touched.
pub struct NullSink;

impl ControlSink for NullSink {
    fn set_azimuth(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        log::info!(target: "sink", "[dry-run] ch{} azimuth {}", channel, degrees);
        Ok(())
    }
    fn set_elevation(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        log::info!(target: "sink", "[dry-run] ch{} elevation {}", channel, degrees);
        Ok(())
    }
    fn set_gain(&self, channel: ChannelIndex, gain: f32) -> SinkResult {
        log::info!(target: "sink", "[dry-run] ch{} gain {}", channel, gain);
        Ok(())
    }
    fn retarget(&self, node: GraphId) -> SinkResult {
        log::info!(target: "sink", "[dry-run] target node {}", node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_names_render_channel() {
        let names = ParamNames::default();
        let ch = ChannelIndex::new(3);
        assert_eq!(names.azimuth_for(ch), "spk3:Azimuth");
        assert_eq!(names.elevation_for(ch), "spk3:Elevation");
        assert_eq!(names.gain_for(ch), vec!["mixL:Gain 3", "mixR:Gain 3"]);
    }

    #[test]
    fn test_sink_records_and_fails() {
        let sink = TestSink::new();
        let ch = ChannelIndex::new(1);
        sink.set_azimuth(ch, 90.0).unwrap();
        sink.set_failing(true);
        assert!(sink.set_gain(ch, 0.3).is_err());
        sink.set_failing(false);
        sink.set_gain(ch, 0.5).unwrap();
        assert_eq!(sink.azimuths(ch), vec![90.0]);
        assert_eq!(sink.gains(ch), vec![0.5]);
        assert_eq!(sink.operations().len(), 2);
    }
}
