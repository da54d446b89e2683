use serde::{Deserialize, Serialize};

use crate::GraphId;

/// Immutable capture of the routing graph: every node, port and link the
/// topology source reported at one point in time. Anything absent from the
/// snapshot simply does not exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeInfo>,
    pub ports: Vec<PortInfo>,
    pub links: Vec<LinkInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: GraphId,
    /// `node.name` property
    pub name: Option<String>,
    /// Input port count the node declares about itself (`n-input-ports`)
    pub declared_input_ports: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub id: GraphId,
    pub node_id: GraphId,
    pub direction: PortDirection,
    /// `port.name` property
    pub name: Option<String>,
    /// `port.alias` property
    pub alias: Option<String>,
}

impl PortInfo {
    /// Human label: the explicit alias when present, else the plain port name.
    pub fn label(&self) -> Option<&str> {
        self.alias
            .as_deref()
            .filter(|a| !a.is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub id: GraphId,
    pub output_node_id: Option<GraphId>,
    pub output_port_id: GraphId,
    pub input_node_id: GraphId,
    pub input_port_id: GraphId,
}

/// How the caller names the node to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Id(GraphId),
    Name(String),
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "node #{}", id),
            NodeRef::Name(name) => write!(f, "node '{}'", name),
        }
    }
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by id or by its `node.name`. The first match wins.
    pub fn find_node(&self, target: &NodeRef) -> Option<&NodeInfo> {
        match target {
            NodeRef::Id(id) => self.nodes.iter().find(|n| n.id == *id),
            NodeRef::Name(name) => self
                .nodes
                .iter()
                .find(|n| n.name.as_deref() == Some(name.as_str())),
        }
    }

    pub fn port(&self, id: GraphId) -> Option<&PortInfo> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Input ports owned by `node_id`, in snapshot order.
    pub fn input_ports_of(&self, node_id: GraphId) -> impl Iterator<Item = &PortInfo> {
        self.ports
            .iter()
            .filter(move |p| p.node_id == node_id && p.direction == PortDirection::Input)
    }

    /// Links whose input side lands on `node_id`.
    pub fn links_into(&self, node_id: GraphId) -> impl Iterator<Item = &LinkInfo> {
        self.links.iter().filter(move |l| l.input_node_id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(id: u32, alias: Option<&str>, name: Option<&str>) -> PortInfo {
        PortInfo {
            id: GraphId::new(id),
            node_id: GraphId::new(1),
            direction: PortDirection::Output,
            name: name.map(str::to_string),
            alias: alias.map(str::to_string),
        }
    }

    #[test]
    fn port_label_prefers_alias() {
        assert_eq!(port(5, Some("FL"), Some("output_FL")).label(), Some("FL"));
        assert_eq!(port(5, None, Some("output_FL")).label(), Some("output_FL"));
        assert_eq!(port(5, Some(""), Some("output_FL")).label(), Some("output_FL"));
        assert_eq!(port(5, None, None).label(), None);
    }

    #[test]
    fn find_node_by_id_and_name() {
        let snapshot = GraphSnapshot {
            nodes: vec![
                NodeInfo { id: GraphId::new(30), name: Some("a".into()), declared_input_ports: None },
                NodeInfo { id: GraphId::new(42), name: Some("b".into()), declared_input_ports: Some(4) },
            ],
            ..Default::default()
        };
        assert_eq!(snapshot.find_node(&NodeRef::Id(GraphId::new(42))).map(|n| n.id.get()), Some(42));
        assert_eq!(snapshot.find_node(&NodeRef::Name("a".into())).map(|n| n.id.get()), Some(30));
        assert!(snapshot.find_node(&NodeRef::Name("zzz".into())).is_none());
    }
}
