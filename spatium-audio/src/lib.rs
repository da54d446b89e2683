//! # spatium-audio
//!
//! Plumbing between the control engine and the PipeWire graph it drives.
//!
//! - [`backend`]: the `ControlSink` trait the dispatcher emits into, plus
//!   recording/no-op doubles for tests and dry runs
//! - [`pw_cli`]: `PwCliSink`, which turns sink calls into `pw-cli set-param`
//! - [`sender`]: `QueuedSink`, a bounded queue + dedicated thread so slow
//!   external commands never stall a tick
//! - [`source`]: where `GraphSnapshot`s come from (`pw-dump`, a saved dump)

pub mod backend;
pub mod pw_cli;
pub mod sender;
pub mod source;

pub use backend::{ControlSink, DeferredFailure, NullSink, ParamNames, SinkError, SinkParam, SinkResult};
pub use pw_cli::PwCliSink;
pub use sender::QueuedSink;
pub use source::{parse_pw_dump, FileSource, PwDumpSource, TopologyError, TopologyResult, TopologySource};
