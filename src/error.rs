use thiserror::Error;

use crate::calculation::Direction;
use crate::network::{Activation, ConnectionType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("no calculated layers given, the traversal has nothing to start from")]
    NoCalculatedLayers,

    #[error("layer {0} is not part of the network")]
    UnknownLayer(usize),

    #[error("connection {0} is not part of the network")]
    UnknownConnection(usize),

    #[error("layer {layer} can not be reached from the calculated layers")]
    UnresolvableTarget { layer: usize },

    #[error("value of layer {layer} required by connection {connection} is missing")]
    MissingDependencyValue { layer: usize, connection: usize },

    #[error(
        "connection {connection} produced a {actual:?} contribution for layer {layer}, expected {expected:?}"
    )]
    ShapeMismatch {
        connection: usize,
        layer: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error(
        "connection {connection} can not read the {actual:?} value of layer {layer}, expected {expected} rows"
    )]
    SourceMismatch {
        connection: usize,
        layer: usize,
        expected: usize,
        actual: (usize, usize),
    },

    #[error("connection {connection} has invalid parameters: {reason}")]
    InvalidParameters {
        connection: usize,
        reason: &'static str,
    },

    #[error("sample {sample} of the batch has {actual} values, expected {expected}")]
    RaggedBatch {
        sample: usize,
        expected: usize,
        actual: usize,
    },

    #[error("layer value holds {samples} samples, expected a single one")]
    NotASingleSample { samples: usize },

    #[error("no calculator registered for {0:?} connections")]
    MissingCalculator(ConnectionType),

    #[error("no function registered for {0:?} activation")]
    MissingActivation(Activation),

    #[error("calculator for {expected:?} connections was given connection {connection} of type {actual:?}")]
    UnexpectedKind {
        connection: usize,
        expected: ConnectionType,
        actual: ConnectionType,
    },

    #[error("{kind:?} connection {connection} can not propagate {direction:?}")]
    UnsupportedDirection {
        connection: usize,
        kind: ConnectionType,
        direction: Direction,
    },
}
