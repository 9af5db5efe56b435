use nalgebra::DMatrix;

use crate::calculation::{ConnectionInput, Direction};
use crate::error::CalculationError;
use crate::network::{ConnectionKind, ConnectionType};

/// Scales the single unit of the bias layer by one weight per receiving unit.
pub fn calculate(input: &ConnectionInput) -> Result<DMatrix<f64>, CalculationError> {
    let weights = match input.kind {
        ConnectionKind::Bias(weights) => weights,
        _ => return Err(input.unexpected_kind(ConnectionType::Bias)),
    };
    let source = input.source;

    match input.direction {
        Direction::Forward => {
            if source.nrows() != 1 {
                return Err(input.source_mismatch(1));
            }
            Ok(DMatrix::from_fn(weights.len(), source.ncols(), |unit, sample| {
                weights[unit] * source[(0, sample)]
            }))
        }
        Direction::Backward => {
            if source.nrows() != weights.len() {
                return Err(input.source_mismatch(weights.len()));
            }
            Ok(DMatrix::from_fn(1, source.ncols(), |_, sample| {
                source.column(sample).dot(weights)
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::calculate;
    use crate::calculation::{ConnectionInput, Direction};
    use crate::network::ConnectionKind;
    use nalgebra::dmatrix;

    #[test]
    fn broadcasts_over_batch() {
        let kind = ConnectionKind::bias(&[0.5, -1.0, 2.0]);
        let ones = dmatrix![1.0, 1.0];
        let input = ConnectionInput {
            connection: 0,
            kind: &kind,
            direction: Direction::Forward,
            layer: 1,
            units: 3,
            source_layer: 0,
            source: &ones,
        };

        assert_eq!(
            calculate(&input).unwrap(),
            dmatrix![0.5, 0.5; -1.0, -1.0; 2.0, 2.0]
        );
    }

    #[test]
    fn backward_sums_weighted_signal() {
        let kind = ConnectionKind::bias(&[0.5, -1.0, 2.0]);
        let error = dmatrix![2.0; 1.0; 1.0];
        let input = ConnectionInput {
            connection: 0,
            kind: &kind,
            direction: Direction::Backward,
            layer: 0,
            units: 1,
            source_layer: 1,
            source: &error,
        };

        assert_eq!(calculate(&input).unwrap(), dmatrix![2.0]);
    }
}
