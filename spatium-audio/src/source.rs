//! Topology sources: where graph snapshots come from.
//!
//! `pw-dump` prints the whole PipeWire registry as a JSON array of objects
//! tagged with `"type"`. Only nodes, ports and links matter here; everything
//! else (clients, modules, metadata, devices) is skipped.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;
use serde_json::Value;
use spatium_types::{GraphId, GraphSnapshot, LinkInfo, NodeInfo, NodeRef, PortDirection, PortInfo};

pub type TopologyResult<T> = Result<T, TopologyError>;

/// Why a topology could not be captured or resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// The requested node is not in the snapshot.
    NodeNotFound(NodeRef),
    /// The snapshot could not be interpreted.
    Malformed(String),
    /// The source itself failed (process, file).
    Source(String),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound(target) => write!(f, "{} not found in graph", target),
            Self::Malformed(msg) => write!(f, "malformed graph snapshot: {}", msg),
            Self::Source(msg) => write!(f, "topology source failed: {}", msg),
        }
    }
}

impl std::error::Error for TopologyError {}

impl From<serde_json::Error> for TopologyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

impl From<std::io::Error> for TopologyError {
    fn from(e: std::io::Error) -> Self {
        Self::Source(e.to_string())
    }
}

/// Supplies a fresh snapshot on demand. No retries, no polling.
pub trait TopologySource {
    fn snapshot(&self) -> TopologyResult<GraphSnapshot>;
}

/// Runs `pw-dump` and parses its output.
pub struct PwDumpSource {
    program: String,
}

impl PwDumpSource {
    pub fn new() -> Self {
        Self {
            program: "pw-dump".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PwDumpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologySource for PwDumpSource {
    fn snapshot(&self) -> TopologyResult<GraphSnapshot> {
        let output = Command::new(&self.program).output()?;
        if !output.status.success() {
            return Err(TopologyError::Source(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        parse_pw_dump(&text)
    }
}

/// Reads a previously saved `pw-dump` file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TopologySource for FileSource {
    fn snapshot(&self) -> TopologyResult<GraphSnapshot> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            TopologyError::Source(format!("{}: {}", self.path.display(), e))
        })?;
        parse_pw_dump(&text)
    }
}

const TYPE_NODE: &str = "PipeWire:Interface:Node";
const TYPE_PORT: &str = "PipeWire:Interface:Port";
const TYPE_LINK: &str = "PipeWire:Interface:Link";

#[derive(Deserialize)]
struct DumpObject {
    id: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    info: Option<Value>,
}

/// Convert `pw-dump` JSON into a `GraphSnapshot`.
pub fn parse_pw_dump(json: &str) -> TopologyResult<GraphSnapshot> {
    let root: Value = serde_json::from_str(json)?;
    let Value::Array(items) = root else {
        return Err(TopologyError::Malformed("expected a JSON array of objects".to_string()));
    };

    let mut snapshot = GraphSnapshot::new();
    for item in items {
        let obj: DumpObject = match serde_json::from_value(item) {
            Ok(o) => o,
            Err(e) => {
                log::debug!(target: "topology", "skipping unrecognised dump entry: {}", e);
                continue;
            }
        };
        let Some(info) = obj.info.as_ref() else {
            continue;
        };
        let id = GraphId::new(obj.id);
        match obj.kind.as_str() {
            TYPE_NODE => snapshot.nodes.push(parse_node(id, info)),
            TYPE_PORT => match parse_port(id, info) {
                Some(port) => snapshot.ports.push(port),
                None => log::debug!(target: "topology", "port {} lacks node.id/direction", id),
            },
            TYPE_LINK => match parse_link(id, info) {
                Some(link) => snapshot.links.push(link),
                None => log::debug!(target: "topology", "link {} lacks port ids", id),
            },
            _ => {}
        }
    }

    log::debug!(
        target: "topology",
        "parsed pw-dump: {} nodes, {} ports, {} links",
        snapshot.nodes.len(),
        snapshot.ports.len(),
        snapshot.links.len()
    );
    Ok(snapshot)
}

fn parse_node(id: GraphId, info: &Value) -> NodeInfo {
    NodeInfo {
        id,
        name: str_prop(info, "node.name"),
        declared_input_ports: u32_field(info, "n-input-ports"),
    }
}

fn parse_port(id: GraphId, info: &Value) -> Option<PortInfo> {
    let direction = match info.get("direction").and_then(Value::as_str)? {
        "input" | "in" => PortDirection::Input,
        "output" | "out" => PortDirection::Output,
        _ => return None,
    };
    let props = info.get("props")?;
    Some(PortInfo {
        id,
        node_id: GraphId::new(u32_field(props, "node.id")?),
        direction,
        name: str_prop(info, "port.name"),
        alias: str_prop(info, "port.alias"),
    })
}

fn parse_link(id: GraphId, info: &Value) -> Option<LinkInfo> {
    Some(LinkInfo {
        id,
        output_node_id: u32_field(info, "output-node-id").map(GraphId::new),
        output_port_id: GraphId::new(u32_field(info, "output-port-id")?),
        input_node_id: GraphId::new(u32_field(info, "input-node-id")?),
        input_port_id: GraphId::new(u32_field(info, "input-port-id")?),
    })
}

fn str_prop(info: &Value, key: &str) -> Option<String> {
    info.get("props")
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// pw-dump writes ids as numbers, but some props arrive as numeric strings.
fn u32_field(v: &Value, key: &str) -> Option<u32> {
    match v.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
