//! The control engine: owns the resolved channel table and wires the
//! transform, gain model and dispatcher together.
//!
//! All methods take the current `Instant` from the caller; the engine never
//! reads the clock itself.

use std::time::{Duration, Instant};

use spatium_audio::{ControlSink, TopologyResult, TopologySource};
use spatium_types::{ChannelIndex, ChannelMap, ChannelView, GraphId, GraphSnapshot, NodeRef, Position};

use crate::dispatch::{ThrottledDispatcher, TickReport, Ticker};
use crate::falloff::{SharedFalloff, DEFAULT_FALLOFF};
use crate::gain::GainLaw;
use crate::layout::initial_positions;
use crate::topology::{resolve, ResolvedTopology};
use crate::transform::{quantize_azimuth, MapGeometry, Placement};

pub const MIN_ELEVATION_DEG: f32 = -90.0;
pub const MAX_ELEVATION_DEG: f32 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub target: NodeRef,
    pub geometry: MapGeometry,
    pub gain_law: GainLaw,
    pub falloff_compensation: f32,
    pub tick_interval: Duration,
    pub elevation_debounce: Duration,
    /// 0 disables quantisation.
    pub azimuth_resolution_deg: f32,
    pub initial_radius: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            target: NodeRef::Name("effect_input.multi_spatial".to_string()),
            geometry: MapGeometry::default(),
            gain_law: GainLaw::default(),
            falloff_compensation: DEFAULT_FALLOFF,
            tick_interval: Duration::from_millis(50),
            elevation_debounce: Duration::from_millis(30),
            azimuth_resolution_deg: 1.0,
            initial_radius: 60.0,
        }
    }
}

/// Operator-facing state of one channel.
#[derive(Debug, Clone, Copy)]
struct SourceState {
    placement: Placement,
    elevation_deg: f32,
}

pub struct Engine {
    settings: EngineSettings,
    falloff: SharedFalloff,
    topology: Option<ResolvedTopology>,
    sources: Vec<SourceState>,
    dispatcher: ThrottledDispatcher,
    ticker: Ticker,
}

impl Engine {
    pub fn new(settings: EngineSettings, sink: Box<dyn ControlSink>, now: Instant) -> Self {
        let falloff = SharedFalloff::new(settings.falloff_compensation);
        let dispatcher = ThrottledDispatcher::new(
            sink,
            settings.geometry,
            settings.gain_law,
            falloff.clone(),
            settings.elevation_debounce,
        );
        let ticker = Ticker::new(settings.tick_interval, now);
        Self {
            settings,
            falloff,
            topology: None,
            sources: Vec::new(),
            dispatcher,
            ticker,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Point the engine at a different node. Takes effect on the next reload.
    pub fn set_target(&mut self, target: NodeRef) {
        self.settings.target = target;
    }

    /// Resolve `snapshot` and install the resulting channel table, replacing
    /// all per-channel state at once. On error the previous table stays in
    /// place and keeps running.
    pub fn reload(&mut self, snapshot: &GraphSnapshot, now: Instant) -> TopologyResult<&ChannelMap> {
        let resolved = match resolve(snapshot, &self.settings.target) {
            Ok(resolved) => resolved,
            Err(e) => {
                log::error!(target: "engine", "topology reload failed: {}", e);
                return Err(e);
            }
        };

        let count = resolved.channels.len();
        self.dispatcher.install(count);
        if let Err(e) = self.dispatcher.retarget(resolved.node_id) {
            log::warn!(target: "engine", "could not retarget sink to node {}: {}", resolved.node_id, e);
        }

        self.sources = initial_positions(count, self.settings.initial_radius)
            .into_iter()
            .map(|position| SourceState {
                placement: self.placement_for(position),
                elevation_deg: 0.0,
            })
            .collect();

        for (slot, source) in self.sources.iter().enumerate() {
            let channel = ChannelIndex::new(slot as u32 + 1);
            self.dispatcher
                .set_pending(channel, source.placement.azimuth_deg, source.placement.distance_m);
            self.dispatcher.set_elevation(channel, source.elevation_deg, now);
        }

        log::info!(
            target: "engine",
            "installed {} channels for node {}",
            count,
            resolved.node_id
        );
        let topology = self.topology.insert(resolved);
        Ok(&topology.channels)
    }

    /// Fetch a snapshot from `source` and reload from it.
    pub fn reload_from(&mut self, source: &dyn TopologySource, now: Instant) -> TopologyResult<&ChannelMap> {
        let snapshot = match source.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!(target: "engine", "could not read topology: {}", e);
                return Err(e);
            }
        };
        self.reload(&snapshot, now)
    }

    /// Move a channel's source. The position is clamped to the map; the
    /// resulting placement becomes pending for the next tick. Returns `None`
    /// for channels that do not exist.
    pub fn move_source(&mut self, channel: ChannelIndex, raw: Position) -> Option<Placement> {
        if !raw.x.is_finite() || !raw.y.is_finite() {
            log::debug!(target: "engine", "ch{} ignoring non-finite position {:?}", channel, raw);
            return None;
        }
        let placement = self.placement_for(raw);
        let source = self.sources.get_mut(channel.slot())?;
        source.placement = placement;
        self.dispatcher
            .set_pending(channel, placement.azimuth_deg, placement.distance_m);
        Some(placement)
    }

    /// Set a channel's elevation, clamped to [-90, 90]. The value is sent
    /// once it has been stable for the debounce window.
    pub fn set_elevation(&mut self, channel: ChannelIndex, degrees: f32, now: Instant) -> Option<f32> {
        if degrees.is_nan() {
            return None;
        }
        let degrees = degrees.clamp(MIN_ELEVATION_DEG, MAX_ELEVATION_DEG);
        let source = self.sources.get_mut(channel.slot())?;
        source.elevation_deg = degrees;
        self.dispatcher.set_elevation(channel, degrees, now);
        Some(degrees)
    }

    /// Change the falloff compensation for every channel. Returns the value
    /// in effect after clamping.
    pub fn set_falloff(&self, value: f32) -> f32 {
        self.falloff.set(value)
    }

    /// Shared handle to the falloff compensation.
    pub fn falloff(&self) -> &SharedFalloff {
        &self.falloff
    }

    /// Tick if one is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TickReport> {
        if self.ticker.due(now) {
            Some(self.dispatcher.tick(now))
        } else {
            None
        }
    }

    /// Flush immediately, regardless of the schedule.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.dispatcher.tick(now)
    }

    pub fn next_tick_at(&self) -> Instant {
        self.ticker.next_at()
    }

    pub fn dispatcher(&self) -> &ThrottledDispatcher {
        &self.dispatcher
    }

    pub fn channel_map(&self) -> Option<&ChannelMap> {
        self.topology.as_ref().map(|t| &t.channels)
    }

    pub fn topology(&self) -> Option<&ResolvedTopology> {
        self.topology.as_ref()
    }

    pub fn node_id(&self) -> Option<GraphId> {
        self.topology.as_ref().map(|t| t.node_id)
    }

    /// Snapshot of every channel for drawing.
    pub fn channel_views(&self) -> Vec<ChannelView> {
        let Some(map) = self.channel_map() else {
            return Vec::new();
        };
        map.iter()
            .zip(&self.sources)
            .map(|((channel, label), source)| ChannelView {
                channel,
                label: label.to_string(),
                position: source.placement.position,
                azimuth_deg: source.placement.azimuth_deg,
                distance_m: source.placement.distance_m,
                gain: self.dispatcher.gain_for(source.placement.distance_m),
                elevation_deg: source.elevation_deg,
            })
            .collect()
    }

    fn placement_for(&self, raw: Position) -> Placement {
        let mut placement = self.settings.geometry.place(raw);
        placement.azimuth_deg = quantize_azimuth(placement.azimuth_deg, self.settings.azimuth_resolution_deg);
        placement
    }
}
