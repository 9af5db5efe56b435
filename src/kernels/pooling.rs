use nalgebra::DMatrix;

use crate::calculation::{ConnectionInput, Direction};
use crate::error::CalculationError;
use crate::network::{ConnectionKind, ConnectionType, Pooling};

/// Pools non-overlapping regions of each feature map.
///
/// Average pooling spreads a backward signal evenly over its region. Max pooling
/// would need the forward activations to do the same and refuses to propagate
/// backward.
pub fn calculate(input: &ConnectionInput) -> Result<DMatrix<f64>, CalculationError> {
    let subsampling = match input.kind {
        ConnectionKind::Subsampling(subsampling) => subsampling,
        _ => return Err(input.unexpected_kind(ConnectionType::Subsampling)),
    };
    if subsampling.region_rows == 0 || subsampling.region_cols == 0 {
        return Err(CalculationError::InvalidParameters {
            connection: input.connection,
            reason: "pooling region must not be empty",
        });
    }

    let source = input.source;
    let shape = subsampling.input;
    let output = subsampling.output();
    let (region_rows, region_cols) = (subsampling.region_rows, subsampling.region_cols);
    let region_size = (region_rows * region_cols) as f64;

    match (input.direction, subsampling.pooling) {
        (Direction::Forward, pooling) => {
            if source.nrows() != shape.units() {
                return Err(input.source_mismatch(shape.units()));
            }
            let mut result = DMatrix::zeros(output.units(), source.ncols());
            for sample in 0..source.ncols() {
                for feature in 0..output.features {
                    for row in 0..output.rows {
                        for col in 0..output.cols {
                            let region = (0..region_rows).flat_map(|r_row| {
                                (0..region_cols).map(move |r_col| {
                                    source[(
                                        shape.index(
                                            feature,
                                            row * region_rows + r_row,
                                            col * region_cols + r_col,
                                        ),
                                        sample,
                                    )]
                                })
                            });
                            result[(output.index(feature, row, col), sample)] = match pooling {
                                Pooling::Max => region.fold(f64::NEG_INFINITY, f64::max),
                                Pooling::Average => region.sum::<f64>() / region_size,
                            };
                        }
                    }
                }
            }
            Ok(result)
        }
        (Direction::Backward, Pooling::Average) => {
            if source.nrows() != output.units() {
                return Err(input.source_mismatch(output.units()));
            }
            let mut result = DMatrix::zeros(shape.units(), source.ncols());
            for sample in 0..source.ncols() {
                for feature in 0..output.features {
                    for row in 0..output.rows {
                        for col in 0..output.cols {
                            let share =
                                source[(output.index(feature, row, col), sample)] / region_size;
                            for r_row in 0..region_rows {
                                for r_col in 0..region_cols {
                                    result[(
                                        shape.index(
                                            feature,
                                            row * region_rows + r_row,
                                            col * region_cols + r_col,
                                        ),
                                        sample,
                                    )] = share;
                                }
                            }
                        }
                    }
                }
            }
            Ok(result)
        }
        (Direction::Backward, Pooling::Max) => Err(CalculationError::UnsupportedDirection {
            connection: input.connection,
            kind: ConnectionType::Subsampling,
            direction: Direction::Backward,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::calculate;
    use crate::calculation::{ConnectionInput, Direction};
    use crate::error::CalculationError;
    use crate::network::{ConnectionKind, ConnectionType, Pooling, Shape, Subsampling};
    use nalgebra::{dmatrix, DMatrix};

    fn kind(pooling: Pooling) -> ConnectionKind {
        ConnectionKind::Subsampling(Subsampling {
            input: Shape::new(1, 2, 4),
            region_rows: 2,
            region_cols: 2,
            pooling,
        })
    }

    fn input<'a>(
        kind: &'a ConnectionKind,
        direction: Direction,
        source: &'a DMatrix<f64>,
    ) -> ConnectionInput<'a> {
        ConnectionInput {
            connection: 2,
            kind,
            direction,
            layer: 1,
            units: 0,
            source_layer: 0,
            source,
        }
    }

    #[test]
    fn max_and_average_forward() {
        // [[1, 2, 5, 6], [3, 4, 7, 12]]
        let map = dmatrix![1.0; 2.0; 5.0; 6.0; 3.0; 4.0; 7.0; 12.0];

        let max = kind(Pooling::Max);
        assert_eq!(
            calculate(&input(&max, Direction::Forward, &map)).unwrap(),
            dmatrix![4.0; 12.0]
        );

        let average = kind(Pooling::Average);
        assert_eq!(
            calculate(&input(&average, Direction::Forward, &map)).unwrap(),
            dmatrix![2.5; 7.5]
        );
    }

    #[test]
    fn average_backward_spreads_signal() {
        let average = kind(Pooling::Average);
        let signal = dmatrix![4.0; 8.0];

        assert_eq!(
            calculate(&input(&average, Direction::Backward, &signal)).unwrap(),
            dmatrix![1.0; 1.0; 2.0; 2.0; 1.0; 1.0; 2.0; 2.0]
        );
    }

    #[test]
    fn max_backward_is_unsupported() {
        let max = kind(Pooling::Max);
        let signal = dmatrix![4.0; 8.0];

        assert_eq!(
            calculate(&input(&max, Direction::Backward, &signal)),
            Err(CalculationError::UnsupportedDirection {
                connection: 2,
                kind: ConnectionType::Subsampling,
                direction: Direction::Backward,
            })
        );
    }
}
