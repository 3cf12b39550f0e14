//! Table-driven navigation over the cells of a world.
//!
//! All shortest paths are precomputed by the world provider. This module only looks them up: it
//! never searches the graph itself.

use std::collections::BTreeSet;

use thiserror::Error;

use super::Position;

#[derive(Error, Debug, PartialEq)]
pub enum NavigationError {
    #[error("cell {0} does not exist")]
    CellOutOfRange(usize),
    #[error("cell {0} is occluded")]
    OccludedCell(usize),
    #[error("world has no open cells")]
    NoOpenCells,
    #[error("malformed navigation table: {0}")]
    MalformedTable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Navigation {
    locations: Vec<Option<Position>>,
    paths: Vec<Vec<Option<usize>>>,
    visibility: Vec<BTreeSet<usize>>,
}

impl Navigation {
    /// `locations[cell]` is `None` for occluded cells, `paths[src][dst]` is the next hop from `src`
    /// towards `dst` (`None` if unreachable) and `visibility[cell]` lists the cells mutually visible
    /// with `cell`.
    pub fn new(
        locations: Vec<Option<Position>>,
        paths: Vec<Vec<Option<usize>>>,
        visibility: Vec<Vec<usize>>,
    ) -> Result<Self, NavigationError> {
        let cells = locations.len();
        if paths.len() != cells {
            return Err(NavigationError::MalformedTable(format!(
                "{} path rows for {cells} cells",
                paths.len()
            )));
        }
        if let Some((src, row)) = paths.iter().enumerate().find(|(_, r)| r.len() != cells) {
            return Err(NavigationError::MalformedTable(format!(
                "path row {src} has {} entries for {cells} cells",
                row.len()
            )));
        }
        if let Some(hop) = paths.iter().flatten().flatten().find(|hop| **hop >= cells) {
            return Err(NavigationError::CellOutOfRange(*hop));
        }
        if visibility.len() > cells {
            return Err(NavigationError::MalformedTable(format!(
                "{} visibility rows for {cells} cells",
                visibility.len()
            )));
        }
        let mut visibility = visibility
            .into_iter()
            .map(|row| row.into_iter().collect::<BTreeSet<_>>())
            .collect::<Vec<_>>();
        if let Some(cell) = visibility.iter().flatten().find(|c| **c >= cells) {
            return Err(NavigationError::CellOutOfRange(*cell));
        }
        visibility.resize(cells, BTreeSet::new());

        Ok(Self {
            locations,
            paths,
            visibility,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.locations.len()
    }

    pub fn locations(&self) -> &[Option<Position>] {
        &self.locations
    }

    /// Ids of all cells that have a location.
    pub fn open_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.locations
            .iter()
            .enumerate()
            .filter_map(|(id, location)| location.map(|_| id))
    }

    pub fn location(&self, cell: usize) -> Result<Position, NavigationError> {
        self.locations
            .get(cell)
            .ok_or(NavigationError::CellOutOfRange(cell))?
            .ok_or(NavigationError::OccludedCell(cell))
    }

    /// Open cell closest to `position`, ties going to the lowest id.
    pub fn cell_id(&self, position: Position) -> Result<usize, NavigationError> {
        self.locations
            .iter()
            .enumerate()
            .filter_map(|(id, location)| location.map(|l| (id, l.distance(position))))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
            .ok_or(NavigationError::NoOpenCells)
    }

    /// Next cell on the shortest path from `src` to `dst`; `Ok(None)` if `dst` is unreachable.
    pub fn next_cell(&self, src: usize, dst: usize) -> Result<Option<usize>, NavigationError> {
        self.location(src)?;
        self.location(dst)?;
        Ok(self.paths[src][dst])
    }

    /// Location of the next cell on the way from `current` towards `goal`.
    pub fn next_step(
        &self,
        current: Position,
        goal: Position,
    ) -> Result<Option<Position>, NavigationError> {
        let src = self.cell_id(current)?;
        let dst = self.cell_id(goal)?;
        match self.next_cell(src, dst)? {
            Some(next) => self.location(next).map(Some),
            None => Ok(None),
        }
    }

    pub fn visible_cells(&self, cell: usize) -> Result<&BTreeSet<usize>, NavigationError> {
        self.visibility
            .get(cell)
            .ok_or(NavigationError::CellOutOfRange(cell))
    }

    pub fn is_visible(&self, a: usize, b: usize) -> Result<bool, NavigationError> {
        Ok(a == b || self.visible_cells(a)?.contains(&b))
    }
}
