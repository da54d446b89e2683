//! # spatium-types
//!
//! Shared type definitions for spatium.
//! This crate contains the plain data model used by spatium-audio, spatium-core
//! and the controller binary: graph snapshots, channel maps, positions and
//! the events handed to a control sink.

mod channel;
mod graph;
mod position;

pub use channel::{ChannelMap, ChannelView, DispatchEvent, UNKNOWN_LABEL};
pub use graph::{GraphSnapshot, LinkInfo, NodeInfo, NodeRef, PortDirection, PortInfo};
pub use position::Position;

/// Dense, 1-based channel number. Channel indices are always >= 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ChannelIndex(u32);

impl ChannelIndex {
    /// Create a ChannelIndex. Panics if index == 0.
    pub fn new(index: u32) -> Self {
        assert!(index > 0, "ChannelIndex cannot be zero");
        Self(index)
    }

    /// Fallible constructor for indices coming from operator input.
    pub fn try_new(index: u32) -> Option<Self> {
        (index > 0).then_some(Self(index))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based slot for table lookups.
    pub fn slot(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for ChannelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry id of a node, port or link in the routing graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct GraphId(u32);

impl GraphId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
