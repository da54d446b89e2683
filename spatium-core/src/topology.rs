//! Graph topology → channel enumeration.
//!
//! Channels are the target node's input ports, numbered densely from 1 in
//! ascending port-id order. Each channel is labelled with the alias of the
//! output port feeding it, or `"Unknown"` when nothing (resolvable) feeds it.
//! The node's declared input count decides how many channels exist, not the
//! number of links.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use spatium_audio::{TopologyError, TopologyResult};
use spatium_types::{ChannelMap, GraphId, GraphSnapshot, NodeRef, PortDirection, UNKNOWN_LABEL};

/// Upper bound on channels per spatializer node. Larger counts are treated
/// as a corrupt snapshot.
pub const MAX_CHANNELS: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTopology {
    pub node_id: GraphId,
    pub node_name: Option<String>,
    pub channels: ChannelMap,
    /// Channel count the node declares (or its input-port count when it
    /// declares none). Always equals `channels.len()`.
    pub declared_channels: u32,
    /// Channels that have a resolved upstream label.
    pub labelled_channels: usize,
}

pub fn resolve(snapshot: &GraphSnapshot, target: &NodeRef) -> TopologyResult<ResolvedTopology> {
    let node = snapshot
        .find_node(target)
        .ok_or_else(|| TopologyError::NodeNotFound(target.clone()))?;

    // input port → output port feeding it
    let mut upstream: BTreeMap<GraphId, GraphId> = BTreeMap::new();
    for link in snapshot.links_into(node.id) {
        if let Some(port) = snapshot.port(link.input_port_id) {
            if port.node_id != node.id || port.direction != PortDirection::Input {
                return Err(TopologyError::Malformed(format!(
                    "link {} lands on port {} which is not an input of node {}",
                    link.id, port.id, node.id
                )));
            }
        }
        let existing = upstream.entry(link.input_port_id).or_insert(link.output_port_id);
        if *existing != link.output_port_id {
            log::debug!(
                target: "topology",
                "input port {} has several upstream links, keeping output {}",
                link.input_port_id,
                existing
            );
        }
    }

    // output port → alias
    let aliases: HashMap<GraphId, &str> = snapshot
        .ports
        .iter()
        .filter_map(|p| p.label().map(|label| (p.id, label)))
        .collect();

    let mut inputs: BTreeSet<GraphId> = snapshot.input_ports_of(node.id).map(|p| p.id).collect();
    inputs.extend(upstream.keys().copied());

    let declared = node
        .declared_input_ports
        .filter(|n| *n > 0)
        .unwrap_or(inputs.len().min(u32::MAX as usize) as u32);

    if declared > MAX_CHANNELS {
        return Err(TopologyError::Malformed(format!(
            "node {} declares {} input channels (limit {})",
            node.id, declared, MAX_CHANNELS
        )));
    }

    if inputs.len() > declared as usize {
        log::debug!(
            target: "topology",
            "node {} declares {} inputs but {} are visible; extra ports ignored",
            node.id,
            declared,
            inputs.len()
        );
    }

    let mut labels: Vec<String> = inputs
        .iter()
        .take(declared as usize)
        .map(|input| {
            upstream
                .get(input)
                .and_then(|output| aliases.get(output))
                .map(|alias| alias.to_string())
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
        })
        .collect();
    labels.resize(declared as usize, UNKNOWN_LABEL.to_string());

    let labelled_channels = labels.iter().filter(|l| *l != UNKNOWN_LABEL).count();
    log::info!(
        target: "topology",
        "resolved {} (id {}): {} channels, {} labelled",
        target,
        node.id,
        declared,
        labelled_channels
    );

    Ok(ResolvedTopology {
        node_id: node.id,
        node_name: node.name.clone(),
        channels: ChannelMap::from_labels(labels),
        declared_channels: declared,
        labelled_channels,
    })
}
