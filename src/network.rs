use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;

pub mod io;
pub mod net;

pub use io::LayerValues;

pub mod activations {
    pub const LINEAR: fn(f64) -> f64 = |val| val;
    pub const SIGMOID: fn(f64) -> f64 = |val| 1.0 / (1.0 + (-1.0 * val).exp());
    pub const TANH: fn(f64) -> f64 = |val| val.tanh();
    pub const RELU: fn(f64) -> f64 = |val| val.max(0.0);
    pub const GAUSSIAN: fn(f64) -> f64 = |val| (val * val / -2.0).exp(); // a = 1, b = 0, c = 1
}

/// Tag selecting the function applied to the summed contributions of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activation {
    Linear,
    Sigmoid,
    Tanh,
    Relu,
    Gaussian,
}

impl Activation {
    pub const ALL: [Activation; 5] = [
        Activation::Linear,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Relu,
        Activation::Gaussian,
    ];

    /// Single character shorthand used by the `layers!` macro.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'l' => Some(Activation::Linear),
            's' => Some(Activation::Sigmoid),
            't' => Some(Activation::Tanh),
            'r' => Some(Activation::Relu),
            'g' => Some(Activation::Gaussian),
            _ => None,
        }
    }

    pub fn function(self) -> fn(f64) -> f64 {
        match self {
            Activation::Linear => activations::LINEAR,
            Activation::Sigmoid => activations::SIGMOID,
            Activation::Tanh => activations::TANH,
            Activation::Relu => activations::RELU,
            Activation::Gaussian => activations::GAUSSIAN,
        }
    }
}

/// Shape of a stack of 2-D feature maps, flattened feature major then row major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    pub features: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(features: usize, rows: usize, cols: usize) -> Self {
        Shape {
            features,
            rows,
            cols,
        }
    }

    pub fn units(&self) -> usize {
        self.features * self.rows * self.cols
    }

    pub fn index(&self, feature: usize, row: usize, col: usize) -> usize {
        (feature * self.rows + row) * self.cols + col
    }
}

/// Valid 2-D cross-correlation of `filters` kernels over an input stack.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conv2D {
    pub input: Shape,
    pub filters: usize,
    pub kernel_rows: usize,
    pub kernel_cols: usize,
    pub stride: usize,
    /// Indexed `[filter][feature][kernel row][kernel col]`.
    pub weights: Vec<f64>,
}

impl Conv2D {
    pub fn output(&self) -> Shape {
        let stride = self.stride.max(1);
        Shape::new(
            self.filters,
            self.input.rows.saturating_sub(self.kernel_rows) / stride + 1,
            self.input.cols.saturating_sub(self.kernel_cols) / stride + 1,
        )
    }

    pub fn weight(&self, filter: usize, feature: usize, row: usize, col: usize) -> f64 {
        self.weights[((filter * self.input.features + feature) * self.kernel_rows + row)
            * self.kernel_cols
            + col]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pooling {
    Max,
    Average,
}

/// Non-overlapping pooling of `region_rows x region_cols` windows per feature map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subsampling {
    pub input: Shape,
    pub region_rows: usize,
    pub region_cols: usize,
    pub pooling: Pooling,
}

impl Subsampling {
    pub fn output(&self) -> Shape {
        Shape::new(
            self.input.features,
            self.input.rows / self.region_rows.max(1),
            self.input.cols / self.region_cols.max(1),
        )
    }
}

/// Parameters of a connection, opaque to the traversal and read by the calculators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionKind {
    /// Weights are `output units x input units`.
    FullyConnected(DMatrix<f64>),
    Sparse(CscMatrix<f64>),
    /// One weight per output unit, fed by a single unit layer.
    Bias(DVector<f64>),
    Conv2D(Conv2D),
    Subsampling(Subsampling),
}

/// Registry key for connection calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    FullyConnected,
    Sparse,
    Bias,
    Conv2D,
    Subsampling,
}

impl ConnectionKind {
    /// Fully connected weights given row major, `outputs` rows by `inputs` columns.
    pub fn dense(outputs: usize, inputs: usize, weights: &[f64]) -> Self {
        ConnectionKind::FullyConnected(DMatrix::from_row_slice(outputs, inputs, weights))
    }

    pub fn constant(outputs: usize, inputs: usize, weight: f64) -> Self {
        ConnectionKind::FullyConnected(DMatrix::from_element(outputs, inputs, weight))
    }

    pub fn bias(weights: &[f64]) -> Self {
        ConnectionKind::Bias(DVector::from_column_slice(weights))
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self {
            ConnectionKind::FullyConnected(_) => ConnectionType::FullyConnected,
            ConnectionKind::Sparse(_) => ConnectionType::Sparse,
            ConnectionKind::Bias(_) => ConnectionType::Bias,
            ConnectionKind::Conv2D(_) => ConnectionType::Conv2D,
            ConnectionKind::Subsampling(_) => ConnectionType::Subsampling,
        }
    }
}

pub trait LayerLike {
    fn id(&self) -> usize;
    /// Number of rows of the layers value matrix.
    fn units(&self) -> usize;
    fn activation(&self) -> Activation;
}

pub trait ConnectionLike {
    fn id(&self) -> usize;
    fn input(&self) -> usize;
    fn output(&self) -> usize;
    fn kind(&self) -> &ConnectionKind;

    /// The layer on the other end of the connection, `None` if `layer` is no end of it.
    fn opposite(&self, layer: usize) -> Option<usize> {
        if self.input() == layer {
            Some(self.output())
        } else if self.output() == layer {
            Some(self.input())
        } else {
            None
        }
    }
}

/// Topology queries the calculation needs. Implementations must be deterministic.
///
/// The provided lookups scan all layers or connections on every call, which makes
/// a traversal quadratic. Implementors holding more than a handful of layers should
/// override `layer`, `connection` and especially `connections_of` with indexed
/// lookups, as [`net::Net`] does.
pub trait NetworkLike<L: LayerLike, C: ConnectionLike> {
    fn layers(&self) -> Vec<&L>;
    fn connections(&self) -> Vec<&C>;

    fn layer(&self, id: usize) -> Option<&L> {
        self.layers().into_iter().find(|layer| layer.id() == id)
    }

    fn connection(&self, id: usize) -> Option<&C> {
        self.connections()
            .into_iter()
            .find(|connection| connection.id() == id)
    }

    /// Connections touching `layer`, in a stable order. Called for every explored layer.
    fn connections_of(&self, layer: usize) -> Vec<&C> {
        self.connections()
            .into_iter()
            .filter(|connection| connection.input() == layer || connection.output() == layer)
            .collect()
    }
}
