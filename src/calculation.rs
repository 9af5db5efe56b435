use std::collections::HashMap;

use nalgebra::DMatrix;

pub mod layer_calculator;
pub mod planner;
pub mod registry;

pub use layer_calculator::LayerCalculator;
pub use planner::{order, LayerState, TraversalState};
pub use registry::{CalculatorRegistry, ConnectionFn, ConnectionInput};

/// Value matrix per layer id.
pub type Results = HashMap<usize, DMatrix<f64>>;

/// The contribution of `connection` to `layer` can be computed once every earlier candidate ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub connection: usize,
    pub layer: usize,
}

impl Candidate {
    pub fn new(connection: usize, layer: usize) -> Self {
        Candidate { connection, layer }
    }
}

/// Forward flows from a connection's input to its output, backward the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}
