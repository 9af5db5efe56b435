use std::collections::HashMap;
use std::fmt;

use nalgebra::DMatrix;

use super::Direction;
use crate::error::CalculationError;
use crate::kernels;
use crate::network::{activations, Activation, ConnectionKind, ConnectionType};

/// Everything a connection calculator gets to see.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInput<'a> {
    pub connection: usize,
    pub kind: &'a ConnectionKind,
    pub direction: Direction,
    /// Layer the contribution is for.
    pub layer: usize,
    /// Rows the contribution has to have.
    pub units: usize,
    pub source_layer: usize,
    /// Value of the layer on the other end, already final.
    pub source: &'a DMatrix<f64>,
}

impl<'a> ConnectionInput<'a> {
    pub fn batch(&self) -> usize {
        self.source.ncols()
    }

    pub fn unexpected_kind(&self, expected: ConnectionType) -> CalculationError {
        CalculationError::UnexpectedKind {
            connection: self.connection,
            expected,
            actual: self.kind.connection_type(),
        }
    }

    /// The source value does not have the `expected` number of rows.
    pub fn source_mismatch(&self, expected: usize) -> CalculationError {
        CalculationError::SourceMismatch {
            connection: self.connection,
            layer: self.source_layer,
            expected,
            actual: self.source.shape(),
        }
    }
}

/// Computes the contribution of one connection to the layer on its far end.
pub type ConnectionFn =
    Box<dyn Fn(&ConnectionInput) -> Result<DMatrix<f64>, CalculationError> + Send + Sync>;

/// Lookup of connection calculators and activation functions.
///
/// A calculator registered for a single connection takes precedence over the one
/// registered for its connection type. Activations are kept per direction: a layer
/// reached only backward, like a hidden layer receiving an error signal, is passed
/// through unchanged unless a backward function is registered for its activation.
pub struct CalculatorRegistry {
    by_type: HashMap<ConnectionType, ConnectionFn>,
    by_connection: HashMap<usize, ConnectionFn>,
    activations: HashMap<Activation, fn(f64) -> f64>,
    backward_activations: HashMap<Activation, fn(f64) -> f64>,
}

impl CalculatorRegistry {
    /// Registry without any calculator or activation.
    pub fn empty() -> Self {
        CalculatorRegistry {
            by_type: HashMap::new(),
            by_connection: HashMap::new(),
            activations: HashMap::new(),
            backward_activations: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, connection_type: ConnectionType, calculator: F) -> &mut Self
    where
        F: Fn(&ConnectionInput) -> Result<DMatrix<f64>, CalculationError> + Send + Sync + 'static,
    {
        self.by_type.insert(connection_type, Box::new(calculator));
        self
    }

    pub fn register_for_connection<F>(&mut self, connection: usize, calculator: F) -> &mut Self
    where
        F: Fn(&ConnectionInput) -> Result<DMatrix<f64>, CalculationError> + Send + Sync + 'static,
    {
        self.by_connection.insert(connection, Box::new(calculator));
        self
    }

    pub fn register_activation(
        &mut self,
        activation: Activation,
        function: fn(f64) -> f64,
    ) -> &mut Self {
        self.activations.insert(activation, function);
        self
    }

    /// Function applied to layers with `activation` whose contributions all ran backward.
    pub fn register_backward_activation(
        &mut self,
        activation: Activation,
        function: fn(f64) -> f64,
    ) -> &mut Self {
        self.backward_activations.insert(activation, function);
        self
    }

    pub fn calculator(
        &self,
        connection: usize,
        connection_type: ConnectionType,
    ) -> Result<&ConnectionFn, CalculationError> {
        self.by_connection
            .get(&connection)
            .or_else(|| self.by_type.get(&connection_type))
            .ok_or(CalculationError::MissingCalculator(connection_type))
    }

    pub fn activation(
        &self,
        activation: Activation,
        direction: Direction,
    ) -> Result<fn(f64) -> f64, CalculationError> {
        match direction {
            Direction::Forward => self
                .activations
                .get(&activation)
                .copied()
                .ok_or(CalculationError::MissingActivation(activation)),
            Direction::Backward => Ok(self
                .backward_activations
                .get(&activation)
                .copied()
                .unwrap_or(activations::LINEAR)),
        }
    }

    pub fn calculate(&self, input: &ConnectionInput) -> Result<DMatrix<f64>, CalculationError> {
        let calculator = self.calculator(input.connection, input.kind.connection_type())?;
        calculator(input)
    }
}

impl Default for CalculatorRegistry {
    /// Registry with the kernels of this crate and all activations.
    fn default() -> Self {
        let mut registry = CalculatorRegistry::empty();
        registry
            .register(ConnectionType::FullyConnected, kernels::dense::calculate)
            .register(ConnectionType::Sparse, kernels::sparse::calculate)
            .register(ConnectionType::Bias, kernels::bias::calculate)
            .register(ConnectionType::Conv2D, kernels::conv::calculate)
            .register(ConnectionType::Subsampling, kernels::pooling::calculate);
        for &activation in Activation::ALL.iter() {
            registry.register_activation(activation, activation.function());
        }
        registry
    }
}

impl fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatorRegistry")
            .field("by_type", &self.by_type.keys().collect::<Vec<_>>())
            .field("by_connection", &self.by_connection.keys().collect::<Vec<_>>())
            .field("activations", &self.activations.keys().collect::<Vec<_>>())
            .field(
                "backward_activations",
                &self.backward_activations.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{CalculatorRegistry, ConnectionInput};
    use crate::calculation::Direction;
    use crate::error::CalculationError;
    use crate::network::{activations, Activation, ConnectionKind, ConnectionType};
    use nalgebra::{dmatrix, DMatrix};

    #[test]
    fn default_registry_covers_every_type() {
        let registry = CalculatorRegistry::default();

        for &connection_type in [
            ConnectionType::FullyConnected,
            ConnectionType::Sparse,
            ConnectionType::Bias,
            ConnectionType::Conv2D,
            ConnectionType::Subsampling,
        ]
        .iter()
        {
            assert!(registry.calculator(0, connection_type).is_ok());
        }
        assert_eq!(
            (registry.activation(Activation::Tanh, Direction::Forward).unwrap())(0.0),
            0.0
        );
    }

    #[test]
    fn connection_override_wins_over_type() {
        let mut registry = CalculatorRegistry::default();
        registry.register_for_connection(3, |input: &ConnectionInput| {
            Ok(DMatrix::from_element(input.units, input.batch(), 7.0))
        });

        let kind = ConnectionKind::constant(2, 1, 1.0);
        let source = dmatrix![1.0, 2.0];
        let input = |connection| ConnectionInput {
            connection,
            kind: &kind,
            direction: Direction::Forward,
            layer: 1,
            units: 2,
            source_layer: 0,
            source: &source,
        };

        assert_eq!(
            registry.calculate(&input(3)).unwrap(),
            DMatrix::from_element(2, 2, 7.0)
        );
        assert_eq!(
            registry.calculate(&input(4)).unwrap(),
            dmatrix![1.0, 2.0; 1.0, 2.0]
        );
    }

    #[test]
    fn empty_registry_reports_what_is_missing() {
        let registry = CalculatorRegistry::empty();

        assert_eq!(
            registry.calculator(0, ConnectionType::Bias).err(),
            Some(CalculationError::MissingCalculator(ConnectionType::Bias))
        );
        assert_eq!(
            registry.activation(Activation::Relu, Direction::Forward).err(),
            Some(CalculationError::MissingActivation(Activation::Relu))
        );
    }

    #[test]
    fn backward_activation_passes_values_through_unless_registered() {
        let mut registry = CalculatorRegistry::default();

        let sigmoid = registry
            .activation(Activation::Sigmoid, Direction::Backward)
            .unwrap();
        assert_eq!(sigmoid(-2.0), -2.0);

        registry.register_backward_activation(Activation::Sigmoid, activations::RELU);
        let sigmoid = registry
            .activation(Activation::Sigmoid, Direction::Backward)
            .unwrap();
        assert_eq!(sigmoid(-2.0), 0.0);
        assert_eq!(
            (registry.activation(Activation::Sigmoid, Direction::Forward).unwrap())(0.0),
            0.5
        );
    }
}
