//! `ControlSink` that drives a PipeWire filter-chain node through `pw-cli`.
//!
//! Each write becomes one `pw-cli set-param <node> Props '{ params = [ ... ] }'`
//! invocation. The process is spawned directly (no shell), so parameter names
//! need no quoting beyond the pod syntax itself.

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use spatium_types::{ChannelIndex, GraphId};

use crate::backend::{ControlSink, ParamNames, SinkError, SinkResult};

/// Sentinel for "no node resolved yet".
const NO_NODE: u32 = u32::MAX;

pub struct PwCliSink {
    program: String,
    names: ParamNames,
    node: AtomicU32,
    mirror_azimuth: bool,
}

impl PwCliSink {
    pub fn new(names: ParamNames) -> Self {
        Self {
            program: "pw-cli".to_string(),
            names,
            node: AtomicU32::new(NO_NODE),
            mirror_azimuth: false,
        }
    }

    /// Send `360 - azimuth` for nodes that count azimuth counter-clockwise.
    pub fn with_mirrored_azimuth(mut self, mirror: bool) -> Self {
        self.mirror_azimuth = mirror;
        self
    }

    /// Use a different executable (a wrapper script, an absolute path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn target(&self) -> Option<GraphId> {
        match self.node.load(Ordering::Acquire) {
            NO_NODE => None,
            id => Some(GraphId::new(id)),
        }
    }

    fn set_params(&self, params: &[(String, f32)]) -> SinkResult {
        let node = self
            .target()
            .ok_or_else(|| SinkError("no target node resolved".to_string()))?;
        let pod = props_pod(params);
        log::debug!(target: "sink", "{} set-param {} Props {}", self.program, node, pod);

        let output = Command::new(&self.program)
            .arg("set-param")
            .arg(node.to_string())
            .arg("Props")
            .arg(&pod)
            .output()?;

        if !output.status.success() {
            return Err(SinkError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl ControlSink for PwCliSink {
    fn set_azimuth(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        let degrees = if self.mirror_azimuth { mirror(degrees) } else { degrees };
        self.set_params(&[(self.names.azimuth_for(channel), degrees)])
    }

    fn set_elevation(&self, channel: ChannelIndex, degrees: f32) -> SinkResult {
        self.set_params(&[(self.names.elevation_for(channel), degrees)])
    }

    fn set_gain(&self, channel: ChannelIndex, gain: f32) -> SinkResult {
        let params: Vec<(String, f32)> = self
            .names
            .gain_for(channel)
            .into_iter()
            .map(|name| (name, gain))
            .collect();
        if params.is_empty() {
            return Ok(());
        }
        self.set_params(&params)
    }

    fn retarget(&self, node: GraphId) -> SinkResult {
        self.node.store(node.get(), Ordering::Release);
        log::info!(target: "sink", "pw-cli sink now targets node {}", node);
        Ok(())
    }
}

/// Reflect a compass bearing: clockwise ↔ counter-clockwise, 0 stays 0.
fn mirror(degrees: f32) -> f32 {
    let m = 360.0 - degrees;
    if m >= 360.0 {
        m - 360.0
    } else {
        m
    }
}

/// Render a Props pod: `{ params = [ "spk1:Azimuth" 90 "mixL:Gain 1" 0.3 ] }`.
pub fn props_pod(params: &[(String, f32)]) -> String {
    let mut pod = String::from("{ params = [");
    for (name, value) in params {
        pod.push_str(&format!(" \"{}\" {}", name, value));
    }
    pod.push_str(" ] }");
    pod
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_single_param() {
        let pod = props_pod(&[("spk1:Azimuth".to_string(), 90.0)]);
        assert_eq!(pod, r#"{ params = [ "spk1:Azimuth" 90 ] }"#);
    }

    #[test]
    fn pod_gain_pair() {
        let pod = props_pod(&[
            ("mixL:Gain 2".to_string(), 0.3),
            ("mixR:Gain 2".to_string(), 0.3),
        ]);
        assert_eq!(pod, r#"{ params = [ "mixL:Gain 2" 0.3 "mixR:Gain 2" 0.3 ] }"#);
    }

    #[test]
    fn mirror_keeps_front_and_back() {
        assert_eq!(mirror(0.0), 0.0);
        assert_eq!(mirror(90.0), 270.0);
        assert_eq!(mirror(180.0), 180.0);
        assert_eq!(mirror(359.0), 1.0);
    }

    #[test]
    fn unbound_sink_refuses_writes() {
        let sink = PwCliSink::new(ParamNames::default());
        assert!(sink.target().is_none());
        let err = sink.set_azimuth(ChannelIndex::new(1), 10.0).unwrap_err();
        assert!(err.0.contains("no target node"));
    }

    #[test]
    fn retarget_sets_node() {
        let sink = PwCliSink::new(ParamNames::default());
        sink.retarget(GraphId::new(77)).unwrap();
        assert_eq!(sink.target(), Some(GraphId::new(77)));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let sink = PwCliSink::new(ParamNames::default())
            .with_program("spatium-definitely-not-installed");
        sink.retarget(GraphId::new(5)).unwrap();
        assert!(sink.set_gain(ChannelIndex::new(1), 1.0).is_err());
    }
}
