//! Per-agent observations.

use std::collections::BTreeMap;

use serde::Serialize;

use super::State;

/// A visible wall as seen from the observing agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WallReading {
    pub distance: f64,
    /// Bearing in degrees from the observer's location to the wall's centroid.
    pub bearing: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Sighting {
    Visible(State),
    Hidden,
}

impl Sighting {
    pub fn state(&self) -> Option<&State> {
        match self {
            Sighting::Visible(state) => Some(state),
            Sighting::Hidden => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Sighting::Visible(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Observation {
    pub walls: Vec<WallReading>,
    /// Every registered agent, in registration order, the observer included.
    pub agent_states: Vec<(String, Sighting)>,
}

impl Observation {
    pub fn sighting(&self, name: &str) -> Option<&Sighting> {
        self.agent_states
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sighting)| sighting)
    }

    pub fn visible_agents(&self) -> impl Iterator<Item = (&str, &State)> + '_ {
        self.agent_states
            .iter()
            .filter_map(|(name, sighting)| sighting.state().map(|state| (name.as_str(), state)))
    }
}

/// Symmetric memo keyed by unordered index pairs: `(a, b)` and `(b, a)` share one entry.
#[derive(Clone, Debug, Default)]
pub struct PairCache<T> {
    entries: BTreeMap<(usize, usize), T>,
}

impl<T: Copy> PairCache<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    fn key(a: usize, b: usize) -> (usize, usize) {
        (a.min(b), a.max(b))
    }

    pub fn get(&self, a: usize, b: usize) -> Option<T> {
        self.entries.get(&Self::key(a, b)).copied()
    }

    pub fn get_or_insert_with(&mut self, a: usize, b: usize, f: impl FnOnce() -> T) -> T {
        *self.entries.entry(Self::key(a, b)).or_insert_with(f)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
