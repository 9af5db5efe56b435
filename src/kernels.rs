//! Connection calculators registered by default.
//!
//! Every kernel returns the pre-activation contribution of one connection, one row
//! per unit of the receiving layer and one column per sample.

pub mod bias;
pub mod conv;
pub mod dense;
pub mod pooling;
pub mod sparse;
