use serde::{Deserialize, Serialize};

use crate::{ChannelIndex, Position};

/// Label used for channels whose source port could not be resolved.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Dense channel numbering with human labels. Channel `i` lives at slot `i - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    labels: Vec<String>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from labels already ordered by channel index.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, channel: ChannelIndex) -> Option<&str> {
        self.labels.get(channel.slot()).map(String::as_str)
    }

    pub fn contains(&self, channel: ChannelIndex) -> bool {
        channel.slot() < self.labels.len()
    }

    /// Channels in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (ChannelIndex, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (ChannelIndex::new(i as u32 + 1), label.as_str()))
    }
}

/// One coalesced update for a channel. At least one field is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub channel: ChannelIndex,
    pub azimuth_deg: Option<f32>,
    pub distance_m: Option<f32>,
    pub elevation_deg: Option<f32>,
}

impl DispatchEvent {
    pub fn is_empty(&self) -> bool {
        self.azimuth_deg.is_none() && self.distance_m.is_none() && self.elevation_deg.is_none()
    }
}

/// Read-only projection of one channel for whatever draws the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelView {
    pub channel: ChannelIndex,
    pub label: String,
    pub position: Position,
    pub azimuth_deg: f32,
    pub distance_m: f32,
    pub gain: f32,
    pub elevation_deg: f32,
}
