use std::collections::{hash_map::Entry, HashMap, HashSet};

use nalgebra::DMatrix;

use super::{
    order, Candidate, CalculatorRegistry, ConnectionInput, Direction, Results, TraversalState,
};
use crate::error::CalculationError;
use crate::network::{ConnectionLike, LayerLike, LayerValues, NetworkLike};

/// Calculates layers of a network from layers whose values are known.
///
/// Which connections are evaluated, and in which order, follows from the network
/// graph alone. What a connection computes is up to the [`CalculatorRegistry`].
#[derive(Debug, Default)]
pub struct LayerCalculator {
    registry: CalculatorRegistry,
}

impl LayerCalculator {
    pub fn new(registry: CalculatorRegistry) -> Self {
        LayerCalculator { registry }
    }

    pub fn registry(&self) -> &CalculatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CalculatorRegistry {
        &mut self.registry
    }

    /// Candidates to run, in order, so that `layer` gets calculated from `calculated`.
    pub fn plan<L, C>(
        &self,
        network: &impl NetworkLike<L, C>,
        layer: usize,
        calculated: &HashSet<usize>,
    ) -> Result<Vec<Candidate>, CalculationError>
    where
        L: LayerLike,
        C: ConnectionLike,
    {
        if calculated.is_empty() {
            return Err(CalculationError::NoCalculatedLayers);
        }
        if network.layer(layer).is_none() {
            return Err(CalculationError::UnknownLayer(layer));
        }

        let mut state = TraversalState::new(network, calculated);
        let mut candidates = Vec::new();

        if !order(network, layer, &mut state, &mut candidates) {
            return Err(CalculationError::UnresolvableTarget { layer });
        }

        log::debug!(
            "planned {} connection calculations for layer {} from {} calculated layers",
            candidates.len(),
            layer,
            calculated.len()
        );
        Ok(candidates)
    }

    /// Calculates `layer` and every layer between it and the `calculated` ones.
    ///
    /// `results` has to hold the values of all `calculated` layers. Every layer that
    /// gets a value is written to `results` and added to `calculated`.
    pub fn calculate<L, C>(
        &self,
        network: &impl NetworkLike<L, C>,
        layer: usize,
        calculated: &mut HashSet<usize>,
        results: &mut Results,
    ) -> Result<(), CalculationError>
    where
        L: LayerLike,
        C: ConnectionLike,
    {
        let candidates = self.plan(network, layer, calculated)?;
        self.execute(network, &candidates, calculated, results)
    }

    /// Runs planned candidates, a plan can be executed for any number of batches.
    pub fn execute<L, C>(
        &self,
        network: &impl NetworkLike<L, C>,
        candidates: &[Candidate],
        calculated: &mut HashSet<usize>,
        results: &mut Results,
    ) -> Result<(), CalculationError>
    where
        L: LayerLike,
        C: ConnectionLike,
    {
        // position of the last candidate per destination
        let mut last: HashMap<usize, usize> = HashMap::new();
        for (position, candidate) in candidates.iter().enumerate() {
            last.insert(candidate.layer, position);
        }

        // accumulated value per destination, forward as soon as one contribution ran forward
        let mut pending: HashMap<usize, (DMatrix<f64>, Direction)> = HashMap::new();

        for (position, candidate) in candidates.iter().enumerate() {
            let (contribution, direction) = self.contribution(network, candidate, results)?;

            match pending.entry(candidate.layer) {
                Entry::Occupied(mut entry) => {
                    let (sum, merged) = entry.get_mut();
                    if sum.shape() != contribution.shape() {
                        return Err(CalculationError::ShapeMismatch {
                            connection: candidate.connection,
                            layer: candidate.layer,
                            expected: sum.shape(),
                            actual: contribution.shape(),
                        });
                    }
                    *sum += &contribution;
                    if direction == Direction::Forward {
                        *merged = Direction::Forward;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert((contribution, direction));
                }
            }
            log::trace!(
                "connection {} contributed to layer {}",
                candidate.connection,
                candidate.layer
            );

            if last.get(&candidate.layer) != Some(&position) {
                continue;
            }

            // every contribution to the layer is in, finish it
            if let Some((mut values, direction)) = pending.remove(&candidate.layer) {
                let activation = network
                    .layer(candidate.layer)
                    .ok_or(CalculationError::UnknownLayer(candidate.layer))?
                    .activation();
                let function = self.registry.activation(activation, direction)?;
                for value in values.iter_mut() {
                    *value = function(*value);
                }

                log::trace!("layer {} calculated", candidate.layer);
                results.insert(candidate.layer, values);
                calculated.insert(candidate.layer);
            }
        }

        Ok(())
    }

    /// Calculates `layer` of `network` from a single known `from` layer.
    pub fn propagate<L, C, T>(
        &self,
        network: &impl NetworkLike<L, C>,
        from: usize,
        input: T,
        layer: usize,
    ) -> Result<T, CalculationError>
    where
        L: LayerLike,
        C: ConnectionLike,
        T: LayerValues,
    {
        let mut calculated = HashSet::new();
        calculated.insert(from);
        let mut results = Results::new();
        results.insert(from, input.into_values()?);

        self.calculate(network, layer, &mut calculated, &mut results)?;

        let values = results
            .remove(&layer)
            .ok_or(CalculationError::UnresolvableTarget { layer })?;
        T::from_values(values)
    }

    fn contribution<L, C>(
        &self,
        network: &impl NetworkLike<L, C>,
        candidate: &Candidate,
        results: &Results,
    ) -> Result<(DMatrix<f64>, Direction), CalculationError>
    where
        L: LayerLike,
        C: ConnectionLike,
    {
        let connection = network
            .connection(candidate.connection)
            .ok_or(CalculationError::UnknownConnection(candidate.connection))?;
        let destination = network
            .layer(candidate.layer)
            .ok_or(CalculationError::UnknownLayer(candidate.layer))?;
        let source_layer = connection
            .opposite(candidate.layer)
            .ok_or(CalculationError::UnknownConnection(candidate.connection))?;
        let source = results
            .get(&source_layer)
            .ok_or(CalculationError::MissingDependencyValue {
                layer: source_layer,
                connection: candidate.connection,
            })?;

        let direction = if connection.output() == candidate.layer {
            Direction::Forward
        } else {
            Direction::Backward
        };

        let input = ConnectionInput {
            connection: candidate.connection,
            kind: connection.kind(),
            direction,
            layer: candidate.layer,
            units: destination.units(),
            source_layer,
            source,
        };
        let contribution = self.registry.calculate(&input)?;

        let expected = (destination.units(), source.ncols());
        if contribution.shape() != expected {
            return Err(CalculationError::ShapeMismatch {
                connection: candidate.connection,
                layer: candidate.layer,
                expected,
                actual: contribution.shape(),
            });
        }
        Ok((contribution, direction))
    }
}
