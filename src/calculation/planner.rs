//! Ordering pass over the layer graph.
//!
//! Starting at the layer that is wanted, the graph is explored depth first. Every
//! connection whose opposite layer can be resolved becomes a [`Candidate`] for the
//! layer currently explored, and it is emitted only after everything the opposite
//! layer depends on. Replaying the candidates in order therefore never reads a
//! layer that is not final yet.
//!
//! For the feedforward part of backpropagation the calculated layers hold the
//! input layer and the wanted layer is the output layer. For the backward part it
//! is the other way round: the output layer holds the error signal and the input
//! layer is wanted. RBMs and autoencoders swap visible and hidden layers the same
//! way.

use std::collections::HashMap;

use super::Candidate;
use crate::network::{ConnectionLike, LayerLike, NetworkLike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    Unvisited,
    /// Being explored, reaching it again closes a cycle.
    InProgress,
    /// Value available once the candidates emitted so far ran.
    Calculated,
    /// Only reachable through layers that were still being explored. Explored again
    /// when reached after another layer got calculated.
    Blocked,
    /// Explored without finding any connection it can be computed from.
    Unresolved,
}

/// Layer in progress that kept another layer from being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Blocker {
    position: usize,
    visit: usize,
}

enum Visit {
    Available,
    Blocked(Blocker),
    Unavailable,
}

/// Per layer state of one traversal, indexed by the position of the layer in the network.
#[derive(Debug, Clone)]
pub struct TraversalState {
    index: HashMap<usize, usize>,
    states: Vec<LayerState>,
    // visit number a layer got when it was last put in progress
    visits: Vec<usize>,
    next_visit: usize,
    // earliest visit a blocked layer waits for, and how many layers were calculated by then
    blockers: Vec<Option<(Blocker, usize)>>,
    calculated: usize,
}

impl TraversalState {
    pub fn new<'a, L, C>(
        network: &impl NetworkLike<L, C>,
        calculated: impl IntoIterator<Item = &'a usize>,
    ) -> Self
    where
        L: LayerLike,
        C: ConnectionLike,
    {
        let index: HashMap<usize, usize> = network
            .layers()
            .iter()
            .enumerate()
            .map(|(position, layer)| (layer.id(), position))
            .collect();

        let mut state = TraversalState {
            states: vec![LayerState::Unvisited; index.len()],
            visits: vec![0; index.len()],
            next_visit: 0,
            blockers: vec![None; index.len()],
            calculated: 0,
            index,
        };
        state.reset(calculated);
        state
    }

    /// Prepares the state for another traversal over the same network.
    pub fn reset<'a>(&mut self, calculated: impl IntoIterator<Item = &'a usize>) {
        for state in self.states.iter_mut() {
            *state = LayerState::Unvisited;
        }
        for blocker in self.blockers.iter_mut() {
            *blocker = None;
        }
        self.calculated = 0;
        for &layer in calculated {
            if let Some(&position) = self.index.get(&layer) {
                self.states[position] = LayerState::Calculated;
            }
        }
    }

    pub fn state(&self, layer: usize) -> Option<LayerState> {
        self.index.get(&layer).map(|&position| self.states[position])
    }

    pub fn is_calculated(&self, layer: usize) -> bool {
        self.state(layer) == Some(LayerState::Calculated)
    }

    fn enter(&mut self, position: usize) {
        self.next_visit += 1;
        self.states[position] = LayerState::InProgress;
        self.visits[position] = self.next_visit;
        self.blockers[position] = None;
    }

    fn blocker(&self, position: usize) -> Blocker {
        Blocker {
            position,
            visit: self.visits[position],
        }
    }

    /// Whether exploring the blocked layer at `position` again would give the same answer.
    ///
    /// Nothing can have changed for it as long as no layer got calculated since and
    /// the visit it waits for is still running.
    fn still_blocked(&self, position: usize) -> Option<Blocker> {
        let (blocker, calculated) = self.blockers[position]?;
        let running = self.states[blocker.position] == LayerState::InProgress
            && self.visits[blocker.position] == blocker.visit;
        if running && calculated == self.calculated {
            Some(blocker)
        } else {
            None
        }
    }
}

/// Appends to `candidates` the connections to calculate, in order, so that `layer` becomes available.
///
/// Returns whether `layer` is available afterwards. Connections leading into a
/// layer that is still in progress are cycles and skipped. A layer skipped only
/// because it waits for layers in progress is not given up on: it is explored
/// again when reached after some other layer got calculated.
pub fn order<L, C>(
    network: &impl NetworkLike<L, C>,
    layer: usize,
    state: &mut TraversalState,
    candidates: &mut Vec<Candidate>,
) -> bool
where
    L: LayerLike,
    C: ConnectionLike,
{
    match visit(network, layer, state, candidates) {
        Visit::Available => true,
        Visit::Blocked(_) | Visit::Unavailable => false,
    }
}

fn visit<L, C>(
    network: &impl NetworkLike<L, C>,
    layer: usize,
    state: &mut TraversalState,
    candidates: &mut Vec<Candidate>,
) -> Visit
where
    L: LayerLike,
    C: ConnectionLike,
{
    let position = match state.index.get(&layer) {
        Some(&position) => position,
        None => return Visit::Unavailable,
    };

    match state.states[position] {
        LayerState::Calculated => return Visit::Available,
        LayerState::Unresolved => return Visit::Unavailable,
        LayerState::InProgress => return Visit::Blocked(state.blocker(position)),
        LayerState::Blocked => {
            if let Some(blocker) = state.still_blocked(position) {
                return Visit::Blocked(blocker);
            }
        }
        LayerState::Unvisited => {}
    }

    state.enter(position);

    let mut resolved = false;
    // the earliest visit still in progress, other than this one, that a skipped layer waits for
    let mut earliest: Option<Blocker> = None;
    for connection in network.connections_of(layer) {
        let opposite = match connection.opposite(layer) {
            Some(opposite) => opposite,
            None => {
                log::warn!(
                    "connection {} listed for layer {} does not touch it",
                    connection.id(),
                    layer
                );
                continue;
            }
        };

        match visit(network, opposite, state, candidates) {
            Visit::Available => {
                candidates.push(Candidate::new(connection.id(), layer));
                resolved = true;
            }
            Visit::Blocked(blocker) => {
                log::trace!(
                    "skipping connection {} into layer {}, layer {} waits for layer at position {}",
                    connection.id(),
                    layer,
                    opposite,
                    blocker.position
                );
                if blocker.position != position
                    && earliest.map_or(true, |earliest| blocker.visit < earliest.visit)
                {
                    earliest = Some(blocker);
                }
            }
            Visit::Unavailable => {
                log::trace!(
                    "skipping connection {} into layer {}, layer {} is not available",
                    connection.id(),
                    layer,
                    opposite
                );
            }
        }
    }

    if resolved {
        state.states[position] = LayerState::Calculated;
        state.calculated += 1;
        Visit::Available
    } else if let Some(blocker) = earliest {
        state.states[position] = LayerState::Blocked;
        state.blockers[position] = Some((blocker, state.calculated));
        Visit::Blocked(blocker)
    } else {
        state.states[position] = LayerState::Unresolved;
        Visit::Unavailable
    }
}
