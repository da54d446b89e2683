mod input;
mod runtime;

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use spatium_audio::{ControlSink, FileSource, NullSink, PwCliSink, PwDumpSource, QueuedSink, TopologySource};
use spatium_core::Engine;
use spatium_types::NodeRef;

use crate::input::HELP;
use crate::runtime::{spawn_reader, Runtime};

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spatium")
        .join("spatium.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/spatium.log")) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("spatium: cannot create log file: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, Config::default(), log_file) {
        eprintln!("spatium: failed to initialize logger: {}", e);
        return;
    }

    log::info!("spatium starting (log level: {:?})", log_level);
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("usage: spatium-ctl [-v|--verbose] [--node <name>] [--snapshot <pw-dump.json>] [--dry-run]");
        println!("{}", HELP);
        return Ok(());
    }
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let dry_run = args.iter().any(|a| a == "--dry-run");
    let node = args.iter()
        .position(|a| a == "--node")
        .and_then(|i| args.get(i + 1).cloned());
    let snapshot = args.iter()
        .position(|a| a == "--snapshot")
        .and_then(|i| args.get(i + 1).map(PathBuf::from));

    let config = spatium_core::Config::load();
    let mut settings = config.engine_settings();
    if let Some(name) = node {
        settings.target = NodeRef::Name(name);
    }

    let sink: Box<dyn ControlSink> = if dry_run {
        Box::new(NullSink)
    } else {
        let pw = PwCliSink::new(config.param_names()).with_mirrored_azimuth(config.mirror_azimuth());
        Box::new(QueuedSink::spawn(Box::new(pw))?)
    };
    let source: Box<dyn TopologySource> = match snapshot {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(PwDumpSource::new()),
    };

    let engine = Engine::new(settings, sink, Instant::now());
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut runtime = Runtime::new(engine, source, rx);
    if !runtime.load(Instant::now()) {
        std::process::exit(1);
    }

    let target = runtime.engine().settings().target.clone();
    let channels = runtime.engine().channel_map().map(|m| m.len()).unwrap_or(0);
    println!("spatium: {} channels on {}", channels, target);
    println!("{}", HELP);

    // the reader thread blocks on stdin forever; it is not joined
    let _reader = spawn_reader(std::io::BufReader::new(std::io::stdin()), tx)?;

    let stdout = std::io::stdout();
    runtime.run(&mut stdout.lock())?;
    log::info!("spatium exiting");
    Ok(())
}
