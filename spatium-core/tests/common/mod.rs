#![allow(dead_code)]
//! Test harness utilities for spatium-core integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use spatium_audio::backend::{SharedTestSink, TestSink};
use spatium_audio::{parse_pw_dump, QueuedSink};
use spatium_core::{Engine, EngineSettings};
use spatium_types::GraphSnapshot;

pub const TICK: Duration = Duration::from_millis(50);

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Four-channel surround player feeding the spatializer through
/// non-contiguous input port ids.
pub fn surround_snapshot() -> GraphSnapshot {
    let json = std::fs::read_to_string(fixture_path("surround_4ch.json")).unwrap();
    parse_pw_dump(&json).unwrap()
}

/// Engine over a recording sink, with the clock starting at the returned instant.
pub fn engine_with_sink() -> (Engine, Arc<TestSink>, Instant) {
    let sink = Arc::new(TestSink::new());
    let t0 = Instant::now();
    let engine = Engine::new(
        EngineSettings::default(),
        Box::new(SharedTestSink(Arc::clone(&sink))),
        t0,
    );
    (engine, sink, t0)
}

/// Engine already loaded from the surround fixture, with the initial layout
/// flushed and the sink cleared.
pub fn settled_engine() -> (Engine, Arc<TestSink>, Instant) {
    let (mut engine, sink, t0) = engine_with_sink();
    engine.reload(&surround_snapshot(), t0).unwrap();
    engine.poll(t0 + TICK).unwrap();
    sink.clear();
    (engine, sink, t0 + TICK)
}

/// Engine writing through a `QueuedSink` whose sender thread feeds a
/// recording sink.
pub fn engine_with_queued_sink() -> (Engine, Arc<TestSink>, Instant) {
    let sink = Arc::new(TestSink::new());
    let queued = QueuedSink::spawn(Box::new(SharedTestSink(Arc::clone(&sink)))).unwrap();
    let t0 = Instant::now();
    let engine = Engine::new(EngineSettings::default(), Box::new(queued), t0);
    (engine, sink, t0)
}

/// Poll `f` until it holds or two seconds pass.
pub fn wait_until<F: FnMut() -> bool>(mut f: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(2) {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}
