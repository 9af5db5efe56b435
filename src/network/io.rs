use nalgebra::{DMatrix, DVector};

use crate::error::CalculationError;

/// Data structures implementing this trait can seed and receive layer values.
///
/// Value matrices hold one row per unit and one column per sample of the mini-batch.
pub trait LayerValues: Sized {
    fn into_values(self) -> Result<DMatrix<f64>, CalculationError>;
    fn from_values(values: DMatrix<f64>) -> Result<Self, CalculationError>;
}

impl LayerValues for DMatrix<f64> {
    fn into_values(self) -> Result<DMatrix<f64>, CalculationError> {
        Ok(self)
    }
    fn from_values(values: DMatrix<f64>) -> Result<Self, CalculationError> {
        Ok(values)
    }
}

fn single_sample(values: &DMatrix<f64>) -> Result<(), CalculationError> {
    if values.ncols() != 1 {
        return Err(CalculationError::NotASingleSample {
            samples: values.ncols(),
        });
    }
    Ok(())
}

/// A single sample.
impl LayerValues for DVector<f64> {
    fn into_values(self) -> Result<DMatrix<f64>, CalculationError> {
        Ok(DMatrix::from_column_slice(self.len(), 1, self.as_slice()))
    }
    fn from_values(values: DMatrix<f64>) -> Result<Self, CalculationError> {
        single_sample(&values)?;
        Ok(DVector::from_column_slice(values.as_slice()))
    }
}

/// A single sample.
impl LayerValues for Vec<f64> {
    fn into_values(self) -> Result<DMatrix<f64>, CalculationError> {
        Ok(DMatrix::from_vec(self.len(), 1, self))
    }
    fn from_values(values: DMatrix<f64>) -> Result<Self, CalculationError> {
        single_sample(&values)?;
        Ok(values.iter().cloned().collect())
    }
}

/// A batch, one inner vector per sample. All samples need the same length.
impl LayerValues for Vec<Vec<f64>> {
    fn into_values(self) -> Result<DMatrix<f64>, CalculationError> {
        let units = self.first().map_or(0, |sample| sample.len());
        if let Some((sample, values)) = self
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != units)
        {
            return Err(CalculationError::RaggedBatch {
                sample,
                expected: units,
                actual: values.len(),
            });
        }
        Ok(DMatrix::from_fn(units, self.len(), |unit, sample| {
            self[sample][unit]
        }))
    }
    fn from_values(values: DMatrix<f64>) -> Result<Self, CalculationError> {
        Ok(values
            .column_iter()
            .map(|sample| sample.iter().cloned().collect())
            .collect())
    }
}

#[cfg(feature = "ndarray")]
use ndarray::Array2;

/// Rows are units, columns are samples.
#[cfg(feature = "ndarray")]
impl LayerValues for Array2<f64> {
    fn into_values(self) -> Result<DMatrix<f64>, CalculationError> {
        Ok(DMatrix::from_fn(self.nrows(), self.ncols(), |row, col| {
            self[[row, col]]
        }))
    }
    fn from_values(values: DMatrix<f64>) -> Result<Self, CalculationError> {
        Ok(Array2::from_shape_fn(
            (values.nrows(), values.ncols()),
            |(row, col)| values[(row, col)],
        ))
    }
}
