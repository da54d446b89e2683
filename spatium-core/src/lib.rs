//! # spatium-core
//!
//! Position-to-parameter control engine. Turns operator placements on a 2D
//! map into per-channel azimuth, elevation and gain writes against a
//! spatializer node in the audio graph, independent of any UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Instant;
//! use spatium_audio::{NullSink, PwDumpSource};
//! use spatium_core::config::Config;
//! use spatium_core::engine::Engine;
//! use spatium_types::{ChannelIndex, Position};
//!
//! // 1. Settings from the embedded defaults plus the user's config file
//! let config = Config::load();
//! let mut engine = Engine::new(config.engine_settings(), Box::new(NullSink), Instant::now());
//!
//! // 2. Resolve the spatializer's inputs into labelled channels
//! engine.reload_from(&PwDumpSource::new(), Instant::now())?;
//!
//! // 3. Feed positions as often as they arrive; nothing is sent yet
//! engine.move_source(ChannelIndex::new(1), Position::new(20.0, -40.0));
//!
//! // 4. Poll from the event loop; at most one write per channel per tick
//! if let Some(report) = engine.poll(Instant::now()) {
//!     // report.emitted, report.failed_writes
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`topology`]: graph snapshot → dense, labelled channel map
//! - [`transform`]: map position → clamped position, azimuth, distance
//! - [`gain`]: distance → inverse-square gain with ceiling
//! - [`falloff`]: process-wide, versioned falloff compensation
//! - [`dispatch`]: per-channel pending/last-sent table, ticks, elevation debounce
//! - [`engine`]: owns all of the above and the reload protocol
//! - [`layout`]: initial ring placement after a reload
//! - [`config`]: TOML defaults merged with the user's config

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod falloff;
pub mod gain;
pub mod layout;
pub mod topology;
pub mod transform;

pub use config::Config;
pub use dispatch::{ThrottledDispatcher, TickReport};
pub use engine::{Engine, EngineSettings};
pub use falloff::SharedFalloff;
pub use gain::GainLaw;
pub use topology::{resolve, ResolvedTopology};
pub use transform::{MapGeometry, Placement};
