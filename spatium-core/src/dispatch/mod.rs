//! Throttled, change-only emission of channel parameters.
//!
//! Position events only update a channel's *pending* slots; nothing is sent
//! until the next tick. On a tick each channel emits at most one
//! azimuth+gain event (carrying the newest pending values, never a queue of
//! intermediate ones) and at most one elevation event. A value equal to
//! what was last sent is dropped. Sink failures are logged and the pending
//! value is discarded; the next position change re-arms the channel. Failures
//! a queued sink reports after the fact clear the matching last-sent value.

mod elevation;
mod ticker;

pub use elevation::ElevationDebounce;
pub use ticker::Ticker;

use std::time::{Duration, Instant};

use spatium_audio::{ControlSink, DeferredFailure, SinkParam, SinkResult};
use spatium_types::{ChannelIndex, DispatchEvent, GraphId};

use crate::falloff::SharedFalloff;
use crate::gain::GainLaw;
use crate::transform::MapGeometry;

/// Per-channel transmission state. Owned by the dispatcher's table.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub last_sent_azimuth: Option<f32>,
    pub last_sent_distance: Option<f32>,
    pub last_sent_gain: Option<f32>,
    pub last_sent_elevation: Option<f32>,
    pub pending_azimuth: Option<f32>,
    pub pending_distance: Option<f32>,
    elevation: ElevationDebounce,
}

impl ChannelState {
    pub fn pending_elevation(&self) -> Option<f32> {
        self.elevation.pending()
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Events the sink accepted, in channel order. Fields whose write failed
    /// are left out; an event with no accepted write is not listed.
    pub emitted: Vec<DispatchEvent>,
    /// Individual sink writes that failed, including failures reported late.
    pub failed_writes: usize,
}

pub struct ThrottledDispatcher {
    sink: Box<dyn ControlSink>,
    geometry: MapGeometry,
    gain_law: GainLaw,
    falloff: SharedFalloff,
    elevation_debounce: Duration,
    channels: Vec<ChannelState>,
    /// Falloff version the last-sent gains were computed with.
    applied_falloff_version: u64,
}

impl ThrottledDispatcher {
    pub fn new(
        sink: Box<dyn ControlSink>,
        geometry: MapGeometry,
        gain_law: GainLaw,
        falloff: SharedFalloff,
        elevation_debounce: Duration,
    ) -> Self {
        let applied_falloff_version = falloff.version();
        Self {
            sink,
            geometry,
            gain_law,
            falloff,
            elevation_debounce,
            channels: Vec::new(),
            applied_falloff_version,
        }
    }

    /// Replace the whole channel table with `count` fresh channels.
    pub fn install(&mut self, count: usize) {
        self.channels = vec![ChannelState::default(); count];
        let stale = self.sink.drain_failures().len();
        if stale > 0 {
            log::debug!(target: "dispatch", "discarded {} failures from the previous table", stale);
        }
        self.applied_falloff_version = self.falloff.version();
        log::debug!(target: "dispatch", "installed {} channel slots", count);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, channel: ChannelIndex) -> Option<&ChannelState> {
        self.channels.get(channel.slot())
    }

    /// Direct the sink at a newly resolved node.
    pub fn retarget(&self, node: GraphId) -> SinkResult {
        self.sink.retarget(node)
    }

    /// Record the latest azimuth/distance for a channel. No emission happens
    /// here. Returns false for channels outside the table.
    pub fn set_pending(&mut self, channel: ChannelIndex, azimuth_deg: f32, distance_m: f32) -> bool {
        let Some(state) = self.channels.get_mut(channel.slot()) else {
            log::debug!(target: "dispatch", "position for unknown channel {}", channel);
            return false;
        };
        state.pending_azimuth = Some(azimuth_deg);
        state.pending_distance = Some(distance_m);
        true
    }

    /// Restart the elevation debounce window for a channel.
    pub fn set_elevation(&mut self, channel: ChannelIndex, degrees: f32, now: Instant) -> bool {
        let window = self.elevation_debounce;
        let Some(state) = self.channels.get_mut(channel.slot()) else {
            log::debug!(target: "dispatch", "elevation for unknown channel {}", channel);
            return false;
        };
        state.elevation.set(degrees, now, window);
        true
    }

    /// Gain for `distance_m` under the current falloff compensation.
    pub fn gain_for(&self, distance_m: f32) -> f32 {
        self.gain_law.gain(distance_m, self.falloff.get())
    }

    /// Flush every channel once.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        let falloff_version = self.falloff.version();
        let compensation = self.falloff.get();
        let refresh_gain = falloff_version != self.applied_falloff_version;

        for failure in self.sink.drain_failures() {
            report.failed_writes += 1;
            self.forget_sent(&failure);
        }

        for slot in 0..self.channels.len() {
            let channel = ChannelIndex::new(slot as u32 + 1);
            self.flush_position(channel, compensation, refresh_gain, &mut report);
            self.flush_elevation(channel, now, &mut report);
        }

        self.applied_falloff_version = falloff_version;
        report
    }

    /// A write that was accepted earlier never reached the graph: drop the
    /// last-sent value so the next change to it is sent again.
    fn forget_sent(&mut self, failure: &DeferredFailure) {
        log::warn!(
            target: "dispatch",
            "ch{} {:?} write failed after submission: {}",
            failure.channel,
            failure.param,
            failure.error
        );
        let Some(state) = self.channels.get_mut(failure.channel.slot()) else {
            return;
        };
        match failure.param {
            SinkParam::Azimuth => state.last_sent_azimuth = None,
            SinkParam::Gain => {
                state.last_sent_distance = None;
                state.last_sent_gain = None;
            }
            SinkParam::Elevation => state.last_sent_elevation = None,
        }
    }

    fn flush_position(
        &mut self,
        channel: ChannelIndex,
        compensation: f32,
        refresh_gain: bool,
        report: &mut TickReport,
    ) {
        let geometry = self.geometry;
        let state = &mut self.channels[channel.slot()];

        let pending_azimuth = state.pending_azimuth.take();
        let pending_distance = state.pending_distance.take().filter(|d| {
            let ok = geometry.distance_in_range(*d);
            if !ok {
                log::debug!(target: "dispatch", "ch{} distance {} out of range, ignored", channel, d);
            }
            ok
        });

        let azimuth_changed = pending_azimuth.is_some_and(|a| a.is_finite() && Some(a) != state.last_sent_azimuth);
        let distance_changed = pending_distance.is_some_and(|d| Some(d) != state.last_sent_distance);
        let regain = refresh_gain && state.last_sent_distance.is_some();

        if !(azimuth_changed || distance_changed || regain) {
            return;
        }

        let event = DispatchEvent {
            channel,
            azimuth_deg: if azimuth_changed { pending_azimuth } else { state.last_sent_azimuth },
            distance_m: if distance_changed { pending_distance } else { state.last_sent_distance },
            elevation_deg: None,
        };
        log::debug!(target: "dispatch", "emit {:?}", event);
        let mut delivered = DispatchEvent {
            azimuth_deg: None,
            distance_m: None,
            ..event
        };

        if let Some(azimuth) = event.azimuth_deg {
            match self.sink.set_azimuth(channel, azimuth) {
                Ok(()) => {
                    state.last_sent_azimuth = Some(azimuth);
                    delivered.azimuth_deg = Some(azimuth);
                }
                Err(e) => {
                    report.failed_writes += 1;
                    log::warn!(target: "dispatch", "ch{} set azimuth {} failed: {}", channel, azimuth, e);
                }
            }
        }

        if let Some(distance) = event.distance_m {
            let gain = self.gain_law.gain(distance, compensation);
            match self.sink.set_gain(channel, gain) {
                Ok(()) => {
                    state.last_sent_distance = Some(distance);
                    state.last_sent_gain = Some(gain);
                    delivered.distance_m = Some(distance);
                }
                Err(e) => {
                    report.failed_writes += 1;
                    log::warn!(target: "dispatch", "ch{} set gain {} failed: {}", channel, gain, e);
                }
            }
        }

        if !delivered.is_empty() {
            report.emitted.push(delivered);
        }
    }

    fn flush_elevation(&mut self, channel: ChannelIndex, now: Instant, report: &mut TickReport) {
        let state = &mut self.channels[channel.slot()];
        let Some(elevation) = state.elevation.fire(now) else {
            return;
        };
        if state.last_sent_elevation == Some(elevation) {
            return;
        }

        let event = DispatchEvent {
            channel,
            azimuth_deg: None,
            distance_m: None,
            elevation_deg: Some(elevation),
        };
        log::debug!(target: "dispatch", "emit {:?}", event);

        match self.sink.set_elevation(channel, elevation) {
            Ok(()) => {
                state.last_sent_elevation = Some(elevation);
                report.emitted.push(event);
            }
            Err(e) => {
                report.failed_writes += 1;
                log::warn!(target: "dispatch", "ch{} set elevation {} failed: {}", channel, elevation, e);
            }
        }
    }
}
