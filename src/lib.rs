//! Calculates the layers of networks that are shaped like arbitrary graphs.
//!
//! A network is a graph of layers joined by connections. Given some layers whose
//! values are known, [`calculation::LayerCalculator`] orders the connections needed
//! to reach a wanted layer and evaluates them. Known input and wanted output give
//! inference, known error signal and wanted input give the backward pass.

pub mod calculation;
pub mod error;
pub mod kernels;
pub mod network;

pub use calculation::{Candidate, LayerCalculator, Results};
pub use error::CalculationError;
