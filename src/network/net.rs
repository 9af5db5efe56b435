use std::collections::HashMap;

use super::{Activation, ConnectionKind, ConnectionLike, LayerLike, NetworkLike};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    id: usize,
    units: usize,
    activation: Activation,
}

impl Layer {
    pub fn new(id: usize, units: usize, activation: Activation) -> Self {
        Layer {
            id,
            units,
            activation,
        }
    }
}

impl LayerLike for Layer {
    fn id(&self) -> usize {
        self.id
    }
    fn units(&self) -> usize {
        self.units
    }
    fn activation(&self) -> Activation {
        self.activation
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    id: usize,
    input: usize,
    output: usize,
    kind: ConnectionKind,
}

impl Connection {
    pub fn new(id: usize, input: usize, output: usize, kind: ConnectionKind) -> Self {
        Connection {
            id,
            input,
            output,
            kind,
        }
    }
}

impl ConnectionLike for Connection {
    fn id(&self) -> usize {
        self.id
    }
    fn input(&self) -> usize {
        self.input
    }
    fn output(&self) -> usize {
        self.output
    }
    fn kind(&self) -> &ConnectionKind {
        &self.kind
    }
}

/// In-memory network graph. Ids handed out by `add_layer` and `connect` are positions.
///
/// Layers and connections are indexed by id, and every layer keeps the connections
/// touching it, so the lookups a traversal makes do not scan the whole graph.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Description", into = "Description"))]
pub struct Net {
    layers: Vec<Layer>,
    connections: Vec<Connection>,
    layer_index: HashMap<usize, usize>,
    connection_index: HashMap<usize, usize>,
    // positions of the connections touching a layer, in insertion order
    adjacency: HashMap<usize, Vec<usize>>,
}

impl NetworkLike<Layer, Connection> for Net {
    fn layers(&self) -> Vec<&Layer> {
        self.layers.iter().collect()
    }
    fn connections(&self) -> Vec<&Connection> {
        self.connections.iter().collect()
    }
    fn layer(&self, id: usize) -> Option<&Layer> {
        self.layer_index
            .get(&id)
            .map(|&position| &self.layers[position])
    }
    fn connection(&self, id: usize) -> Option<&Connection> {
        self.connection_index
            .get(&id)
            .map(|&position| &self.connections[position])
    }
    fn connections_of(&self, layer: usize) -> Vec<&Connection> {
        self.adjacency.get(&layer).map_or_else(Vec::new, |positions| {
            positions
                .iter()
                .map(|&position| &self.connections[position])
                .collect()
        })
    }
}

impl Net {
    pub fn new(layers: Vec<Layer>, connections: Vec<Connection>) -> Self {
        let mut net = Net::default();
        for layer in layers {
            net.push_layer(layer);
        }
        for connection in connections {
            net.push_connection(connection);
        }
        net
    }

    pub fn add_layer(&mut self, units: usize, activation: Activation) -> usize {
        let id = self.layers.len();
        self.push_layer(Layer::new(id, units, activation));
        id
    }

    pub fn connect(&mut self, input: usize, output: usize, kind: ConnectionKind) -> usize {
        let id = self.connections.len();
        self.push_connection(Connection::new(id, input, output, kind));
        id
    }

    fn push_layer(&mut self, layer: Layer) {
        self.layer_index.insert(layer.id, self.layers.len());
        self.layers.push(layer);
    }

    fn push_connection(&mut self, connection: Connection) {
        let position = self.connections.len();
        self.connection_index.insert(connection.id, position);
        self.adjacency
            .entry(connection.input)
            .or_insert_with(Vec::new)
            .push(position);
        if connection.output != connection.input {
            self.adjacency
                .entry(connection.output)
                .or_insert_with(Vec::new)
                .push(position);
        }
        self.connections.push(connection);
    }
}

/// Serialized form of [`Net`], the indices are rebuilt when reading it.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct Description {
    layers: Vec<Layer>,
    connections: Vec<Connection>,
}

#[cfg(feature = "serde")]
impl From<Description> for Net {
    fn from(description: Description) -> Self {
        Net::new(description.layers, description.connections)
    }
}

#[cfg(feature = "serde")]
impl From<Net> for Description {
    fn from(net: Net) -> Self {
        Description {
            layers: net.layers,
            connections: net.connections,
        }
    }
}

#[macro_export]
macro_rules! layers {
    ( $( $units:literal $activation:literal ),* $(,)? ) => {
        {
        let mut layers = Vec::new();

        $(
            layers.push(
                $crate::network::net::Layer::new(
                    layers.len(),
                    $units,
                    $crate::network::Activation::from_code($activation)
                        .expect("unknown activation code"),
                )
            );
        )*

        layers
        }
    };
}

#[macro_export]
macro_rules! connections {
    ( $( $input:literal -> $output:literal : $kind:expr ),* $(,)? ) => {
        {
        let mut connections = Vec::new();

        $(
            connections.push(
                $crate::network::net::Connection::new(connections.len(), $input, $output, $kind)
            );
        )*

        connections
        }
    };
}

#[cfg(test)]
mod tests {
    use super::{Connection, Layer, Net};
    use crate::network::{Activation, ConnectionKind, ConnectionLike, LayerLike, NetworkLike};
    use crate::{connections, layers};

    #[test]
    fn macros_assign_positional_ids() {
        let net = Net::new(
            layers!(2 'l', 3 's', 1 't'),
            connections!(
                0 -> 1: ConnectionKind::constant(3, 2, 0.5),
                1 -> 2: ConnectionKind::constant(1, 3, 0.5),
            ),
        );

        let layer = net.layer(1).unwrap();
        assert_eq!(layer.id(), 1);
        assert_eq!(layer.units(), 3);
        assert_eq!(layer.activation(), Activation::Sigmoid);
        assert_eq!(net.connection(1).unwrap().input(), 1);
        assert!(net.layer(3).is_none());
    }

    #[test]
    fn connections_of_keeps_insertion_order() {
        let mut net = Net::default();
        let a = net.add_layer(1, Activation::Linear);
        let b = net.add_layer(1, Activation::Linear);
        let c = net.add_layer(1, Activation::Linear);
        let first = net.connect(a, b, ConnectionKind::constant(1, 1, 1.0));
        net.connect(a, c, ConnectionKind::constant(1, 1, 1.0));
        let third = net.connect(c, b, ConnectionKind::constant(1, 1, 1.0));

        let ids: Vec<usize> = net.connections_of(b).iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[test]
    fn lookups_follow_ids_that_are_not_positions() {
        let net = Net::new(
            vec![
                Layer::new(10, 1, Activation::Linear),
                Layer::new(20, 2, Activation::Relu),
                Layer::new(30, 1, Activation::Linear),
            ],
            vec![
                Connection::new(7, 10, 20, ConnectionKind::constant(2, 1, 1.0)),
                Connection::new(3, 20, 30, ConnectionKind::constant(1, 2, 1.0)),
                Connection::new(5, 30, 30, ConnectionKind::constant(1, 1, 1.0)),
            ],
        );

        assert_eq!(net.layer(20).unwrap().units(), 2);
        assert!(net.layer(1).is_none());
        assert_eq!(net.connection(3).unwrap().input(), 20);
        assert!(net.connection(1).is_none());

        let ids: Vec<usize> = net.connections_of(20).iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![7, 3]);
        // a self connection is listed once
        let ids: Vec<usize> = net.connections_of(30).iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![3, 5]);
        assert!(net.connections_of(99).is_empty());
    }

    #[test]
    fn index_agrees_with_full_scan() {
        let mut net = Net::new(
            layers!(1 'l', 1 'l', 1 'l', 1 'l'),
            connections!(
                0 -> 1: ConnectionKind::constant(1, 1, 1.0),
                1 -> 2: ConnectionKind::constant(1, 1, 1.0),
            ),
        );
        net.connect(2, 0, ConnectionKind::constant(1, 1, 1.0));
        net.connect(3, 1, ConnectionKind::constant(1, 1, 1.0));
        let extra = net.add_layer(1, Activation::Linear);
        net.connect(extra, 2, ConnectionKind::constant(1, 1, 1.0));

        for layer in 0..=extra {
            let indexed: Vec<usize> = net.connections_of(layer).iter().map(|c| c.id()).collect();
            let scanned: Vec<usize> = net
                .connections()
                .iter()
                .filter(|c| c.input() == layer || c.output() == layer)
                .map(|c| c.id())
                .collect();
            assert_eq!(indexed, scanned);
        }
        assert_eq!(net.layer(extra).unwrap().id(), extra);
    }

    #[test]
    #[should_panic(expected = "unknown activation code")]
    fn unknown_activation_code_is_a_typo() {
        layers!(1 'l', 2 'x');
    }

    #[cfg(feature = "serde")]
    #[test]
    fn reads_network_description_from_ron() {
        let description = "(
            layers: [
                (id: 0, units: 2, activation: Linear),
                (id: 1, units: 1, activation: Sigmoid),
            ],
            connections: [],
        )";

        let net: Net = ron::from_str(description).unwrap();
        assert_eq!(net.layers().len(), 2);
        assert_eq!(net.layer(1).unwrap().activation(), Activation::Sigmoid);

        let mut with_weights = net.clone();
        with_weights.connect(0, 1, ConnectionKind::dense(1, 2, &[0.5, -0.5]));
        let text = ron::to_string(&with_weights).unwrap();
        let restored: Net = ron::from_str(&text).unwrap();
        assert_eq!(restored, with_weights);
    }
}
