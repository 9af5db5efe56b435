use nalgebra::DMatrix;

use crate::calculation::{ConnectionInput, Direction};
use crate::error::CalculationError;
use crate::network::{ConnectionKind, ConnectionType, Conv2D};

fn validate(conv: &Conv2D, input: &ConnectionInput) -> Result<(), CalculationError> {
    let reason = if conv.stride == 0 {
        Some("stride must be positive")
    } else if conv.kernel_rows == 0 || conv.kernel_cols == 0 {
        Some("kernel must not be empty")
    } else if conv.kernel_rows > conv.input.rows || conv.kernel_cols > conv.input.cols {
        Some("kernel larger than input")
    } else if conv.weights.len()
        != conv.filters * conv.input.features * conv.kernel_rows * conv.kernel_cols
    {
        Some("weight count does not match filters and kernel")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CalculationError::InvalidParameters {
            connection: input.connection,
            reason,
        }),
        None => Ok(()),
    }
}

/// Valid cross-correlation forward, the matching transposed convolution backward.
pub fn calculate(input: &ConnectionInput) -> Result<DMatrix<f64>, CalculationError> {
    let conv = match input.kind {
        ConnectionKind::Conv2D(conv) => conv,
        _ => return Err(input.unexpected_kind(ConnectionType::Conv2D)),
    };
    validate(conv, input)?;

    let source = input.source;
    let shape = conv.input;
    let output = conv.output();
    let stride = conv.stride;

    match input.direction {
        Direction::Forward => {
            if source.nrows() != shape.units() {
                return Err(input.source_mismatch(shape.units()));
            }
            let mut result = DMatrix::zeros(output.units(), source.ncols());
            for sample in 0..source.ncols() {
                for filter in 0..output.features {
                    for row in 0..output.rows {
                        for col in 0..output.cols {
                            let mut sum = 0.0;
                            for feature in 0..shape.features {
                                for k_row in 0..conv.kernel_rows {
                                    for k_col in 0..conv.kernel_cols {
                                        sum += conv.weight(filter, feature, k_row, k_col)
                                            * source[(
                                                shape.index(
                                                    feature,
                                                    row * stride + k_row,
                                                    col * stride + k_col,
                                                ),
                                                sample,
                                            )];
                                    }
                                }
                            }
                            result[(output.index(filter, row, col), sample)] = sum;
                        }
                    }
                }
            }
            Ok(result)
        }
        Direction::Backward => {
            if source.nrows() != output.units() {
                return Err(input.source_mismatch(output.units()));
            }
            let mut result = DMatrix::zeros(shape.units(), source.ncols());
            for sample in 0..source.ncols() {
                for filter in 0..output.features {
                    for row in 0..output.rows {
                        for col in 0..output.cols {
                            let signal = source[(output.index(filter, row, col), sample)];
                            for feature in 0..shape.features {
                                for k_row in 0..conv.kernel_rows {
                                    for k_col in 0..conv.kernel_cols {
                                        result[(
                                            shape.index(
                                                feature,
                                                row * stride + k_row,
                                                col * stride + k_col,
                                            ),
                                            sample,
                                        )] += conv.weight(filter, feature, k_row, k_col) * signal;
                                    }
                                }
                            }
                        }
                    }
                }
            }
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::calculate;
    use crate::calculation::{ConnectionInput, Direction};
    use crate::error::CalculationError;
    use crate::network::{ConnectionKind, Conv2D, Shape};
    use nalgebra::{dmatrix, DMatrix};

    fn input<'a>(
        kind: &'a ConnectionKind,
        direction: Direction,
        source: &'a DMatrix<f64>,
    ) -> ConnectionInput<'a> {
        ConnectionInput {
            connection: 0,
            kind,
            direction,
            layer: 1,
            units: 0,
            source_layer: 0,
            source,
        }
    }

    fn summing_kernel(stride: usize) -> ConnectionKind {
        ConnectionKind::Conv2D(Conv2D {
            input: Shape::new(1, 3, 3),
            filters: 1,
            kernel_rows: 2,
            kernel_cols: 2,
            stride,
            weights: vec![1.0, 1.0, 1.0, 1.0],
        })
    }

    #[test]
    fn forward_sums_windows() {
        let kind = summing_kernel(1);
        // 3x3 image 1..=9, row major
        let image = DMatrix::from_fn(9, 1, |unit, _| (unit + 1) as f64);

        let result = calculate(&input(&kind, Direction::Forward, &image)).unwrap();

        assert_eq!(result, dmatrix![12.0; 16.0; 24.0; 28.0]);
    }

    #[test]
    fn multiple_features_and_filters() {
        let kind = ConnectionKind::Conv2D(Conv2D {
            input: Shape::new(2, 2, 2),
            filters: 2,
            kernel_rows: 2,
            kernel_cols: 2,
            stride: 1,
            // filter 0 reads feature 0, filter 1 doubles feature 1
            weights: vec![
                1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0,
            ],
        });
        let image = dmatrix![1.0; 1.0; 1.0; 1.0; 3.0; 3.0; 3.0; 3.0];

        let result = calculate(&input(&kind, Direction::Forward, &image)).unwrap();

        assert_eq!(result, dmatrix![4.0; 24.0]);
    }

    #[test]
    fn backward_scatters_signal() {
        let kind = summing_kernel(1);
        let signal = dmatrix![1.0; 0.0; 0.0; 1.0];

        let result = calculate(&input(&kind, Direction::Backward, &signal)).unwrap();

        assert_eq!(
            result,
            dmatrix![1.0; 1.0; 0.0; 1.0; 2.0; 1.0; 0.0; 1.0; 1.0]
        );
    }

    #[test]
    fn rejects_zero_stride() {
        let kind = summing_kernel(0);
        let image = DMatrix::zeros(9, 1);

        assert_eq!(
            calculate(&input(&kind, Direction::Forward, &image)),
            Err(CalculationError::InvalidParameters {
                connection: 0,
                reason: "stride must be positive",
            })
        );
    }
}
