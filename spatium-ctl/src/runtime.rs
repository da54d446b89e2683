//! Single-threaded event loop: operator events in, ticks on schedule.

use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use spatium_audio::TopologySource;
use spatium_core::Engine;

use crate::input::{parse_line, OperatorEvent};

pub struct Runtime {
    engine: Engine,
    source: Box<dyn TopologySource>,
    events: Receiver<OperatorEvent>,
}

impl Runtime {
    pub fn new(engine: Engine, source: Box<dyn TopologySource>, events: Receiver<OperatorEvent>) -> Self {
        Self { engine, source, events }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Resolve the topology for the first time.
    pub fn load(&mut self, now: Instant) -> bool {
        match self.engine.reload_from(self.source.as_ref(), now) {
            Ok(map) => {
                for (channel, label) in map.iter() {
                    log::info!(target: "engine", "ch{} = {}", channel, label);
                }
                true
            }
            Err(e) => {
                eprintln!("spatium: {}", e);
                false
            }
        }
    }

    /// Run until `quit`, end of input, or the event channel closes.
    pub fn run(&mut self, out: &mut impl Write) -> io::Result<()> {
        loop {
            let timeout = self.engine.next_tick_at().saturating_duration_since(Instant::now());
            match self.events.recv_timeout(timeout) {
                Ok(event) => {
                    if self.handle(event, Instant::now(), out)?.is_break() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.poll(Instant::now());
        }
        // push whatever is still pending before exiting
        let report = self.engine.tick(Instant::now());
        log::debug!(target: "engine", "final flush: {} events", report.emitted.len());
        Ok(())
    }

    fn poll(&mut self, now: Instant) {
        if let Some(report) = self.engine.poll(now) {
            if report.failed_writes > 0 {
                log::debug!(target: "engine", "tick had {} failed writes", report.failed_writes);
            }
        }
    }

    pub fn handle(&mut self, event: OperatorEvent, now: Instant, out: &mut impl Write) -> io::Result<ControlFlow<()>> {
        match event {
            OperatorEvent::Move { channel, position } => {
                if self.engine.move_source(channel, position).is_none() {
                    writeln!(out, "no channel {}", channel)?;
                }
            }
            OperatorEvent::Elevation { channel, degrees } => {
                if self.engine.set_elevation(channel, degrees, now).is_none() {
                    writeln!(out, "no channel {}", channel)?;
                }
            }
            OperatorEvent::Falloff(value) => {
                let applied = self.engine.set_falloff(value);
                writeln!(out, "falloff {}", applied)?;
            }
            OperatorEvent::Reload => match self.engine.reload_from(self.source.as_ref(), now) {
                Ok(map) => writeln!(out, "reloaded: {} channels", map.len())?,
                Err(e) => writeln!(out, "reload failed, keeping previous channels: {}", e)?,
            },
            OperatorEvent::Status => self.write_status(out)?,
            OperatorEvent::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    fn write_status(&self, out: &mut impl Write) -> io::Result<()> {
        match self.engine.node_id() {
            Some(node) => writeln!(out, "node {}  falloff {}", node, self.engine.falloff().get())?,
            None => writeln!(out, "no topology loaded")?,
        }
        for view in self.engine.channel_views() {
            writeln!(
                out,
                "ch{:<2} {:<8} az {:>5.1}  dist {:>7.2} m  gain {:>6.3}  elev {:>5.1}",
                view.channel.get(),
                view.label,
                view.azimuth_deg,
                view.distance_m,
                view.gain,
                view.elevation_deg
            )?;
        }
        Ok(())
    }
}

/// Read operator lines on a dedicated thread. End of input becomes `Quit`.
pub fn spawn_reader<R>(reader: R, tx: Sender<OperatorEvent>) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new().name("stdin-reader".into()).spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!(target: "engine", "stdin read failed: {}", e);
                    break;
                }
            };
            match parse_line(&line) {
                Ok(Some(event)) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{}", e),
            }
        }
        let _ = tx.send(OperatorEvent::Quit);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spatium_audio::backend::{SharedTestSink, TestSink};
    use spatium_audio::{parse_pw_dump, TopologyResult};
    use spatium_core::EngineSettings;
    use spatium_types::{ChannelIndex, GraphSnapshot, Position};
    use std::sync::Arc;

    const DUMP: &str = r#"[
        { "id": 42, "type": "PipeWire:Interface:Node",
          "info": { "n-input-ports": 2, "props": { "node.name": "effect_input.multi_spatial" } } },
        { "id": 50, "type": "PipeWire:Interface:Port",
          "info": { "direction": "input", "props": { "node.id": 42 } } },
        { "id": 51, "type": "PipeWire:Interface:Port",
          "info": { "direction": "input", "props": { "node.id": 42 } } },
        { "id": 61, "type": "PipeWire:Interface:Port",
          "info": { "direction": "output", "props": { "node.id": 7, "port.alias": "L" } } },
        { "id": 90, "type": "PipeWire:Interface:Link",
          "info": { "output-port-id": 61, "input-node-id": 42, "input-port-id": 50 } }
    ]"#;

    struct StaticSource;

    impl TopologySource for StaticSource {
        fn snapshot(&self) -> TopologyResult<GraphSnapshot> {
            parse_pw_dump(DUMP)
        }
    }

    fn runtime() -> (Runtime, Arc<TestSink>, Sender<OperatorEvent>) {
        let sink = Arc::new(TestSink::new());
        let engine = Engine::new(
            EngineSettings::default(),
            Box::new(SharedTestSink(Arc::clone(&sink))),
            Instant::now(),
        );
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut runtime = Runtime::new(engine, Box::new(StaticSource), rx);
        assert!(runtime.load(Instant::now()));
        (runtime, sink, tx)
    }

    #[test]
    fn status_lists_channels() {
        let (mut runtime, _sink, _tx) = runtime();
        let mut out = Vec::new();
        runtime.handle(OperatorEvent::Status, Instant::now(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("node 42"));
        assert!(text.contains("ch1  L"));
        assert!(text.contains("Unknown"));
    }

    #[test]
    fn unknown_channel_is_reported() {
        let (mut runtime, _sink, _tx) = runtime();
        let mut out = Vec::new();
        let event = OperatorEvent::Move {
            channel: ChannelIndex::new(9),
            position: Position::ORIGIN,
        };
        runtime.handle(event, Instant::now(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "no channel 9\n");
    }

    #[test]
    fn quit_breaks() {
        let (mut runtime, _sink, _tx) = runtime();
        let flow = runtime.handle(OperatorEvent::Quit, Instant::now(), &mut Vec::new()).unwrap();
        assert!(flow.is_break());
    }

    #[test]
    fn run_flushes_moves_and_stops_on_quit() {
        let (mut runtime, sink, tx) = runtime();
        tx.send(OperatorEvent::Move {
            channel: ChannelIndex::new(1),
            position: Position::new(0.0, -20.0),
        })
        .unwrap();
        tx.send(OperatorEvent::Quit).unwrap();
        runtime.run(&mut Vec::new()).unwrap();
        assert_eq!(sink.azimuths(ChannelIndex::new(1)).last(), Some(&0.0));
    }

    #[test]
    fn reader_turns_lines_into_events() {
        let input = io::Cursor::new("pos 1 3 4\nbogus\n\nfalloff 2\n");
        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_reader(input, tx).unwrap().join().unwrap();
        let events: Vec<OperatorEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], OperatorEvent::Falloff(2.0));
        assert_eq!(events[2], OperatorEvent::Quit);
    }
}
