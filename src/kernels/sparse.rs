use nalgebra::DMatrix;

use crate::calculation::{ConnectionInput, Direction};
use crate::error::CalculationError;
use crate::network::{ConnectionKind, ConnectionType};

/// Same as the dense kernel, for weights stored column compressed.
pub fn calculate(input: &ConnectionInput) -> Result<DMatrix<f64>, CalculationError> {
    let weights = match input.kind {
        ConnectionKind::Sparse(weights) => weights,
        _ => return Err(input.unexpected_kind(ConnectionType::Sparse)),
    };

    match input.direction {
        Direction::Forward => {
            if weights.ncols() != input.source.nrows() {
                return Err(input.source_mismatch(weights.ncols()));
            }
            Ok(weights * input.source)
        }
        Direction::Backward => {
            if weights.nrows() != input.source.nrows() {
                return Err(input.source_mismatch(weights.nrows()));
            }
            let transposed = weights.transpose();
            Ok(&transposed * input.source)
        }
    }
}
