//! Loading of worlds: arena, occlusions and the precomputed cell tables used for navigation.
//!
//! Worlds are stored as JSON. Positions are `[x, y]` arrays and shapes are either vertex lists or
//! regular hexagons:
//!
//! ```json
//! {
//!     "arena": { "hexagon": { "center": [0.5, 0.5], "size": 0.5 } },
//!     "cell_shape": { "size": 0.025, "rotation": 30 },
//!     "cells": [{ "location": [0.1, 0.5] }, { "location": [0.15, 0.5], "occluded": true }],
//!     "adjacency": [[], []],
//!     "cell_groups": { "spawn_locations": [0] }
//! }
//! ```
//!
//! A hexagonal occlusion of `cell_shape`, turned along with the arena, is placed on every occluded
//! cell in addition to the explicitly listed `occlusions`.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::ModelConfig;
use crate::domain::{
    make_hexagon, GeometryError, Model, ModelError, Navigation, NavigationError, Polygon, Position,
};

#[derive(Error, Debug)]
pub enum WorldError {
    #[error("failed to read world file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed world data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("occluded cells need a cell shape")]
    MissingCellShape,
    #[error("neither a path table nor an adjacency list is given")]
    MissingPaths,
    #[error("adjacency list of cell {cell} refers to unknown cell {neighbour}")]
    InvalidAdjacency { cell: usize, neighbour: usize },
    #[error("cell group {group:?} refers to unknown cell {cell}")]
    InvalidGroup { group: String, cell: usize },
    #[error("no cell group named {0:?}")]
    UnknownGroup(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hexagon {
    pub center: Position,
    pub size: f64,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeSpec {
    Vertices(Vec<Position>),
    Hexagon { hexagon: Hexagon },
}

impl ShapeSpec {
    pub fn polygon(&self) -> Result<Polygon, GeometryError> {
        match self {
            ShapeSpec::Vertices(vertices) => Polygon::new(vertices.clone()),
            ShapeSpec::Hexagon { hexagon } => {
                make_hexagon(hexagon.center, hexagon.size, hexagon.rotation)
            }
        }
    }

    /// Rotation in degrees of a hexagon, zero for vertex lists.
    pub fn rotation(&self) -> f64 {
        match self {
            ShapeSpec::Vertices(_) => 0.0,
            ShapeSpec::Hexagon { hexagon } => hexagon.rotation,
        }
    }
}

/// Shape of a single cell, centered on the cell's location. `rotation` is relative to the arena's
/// rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellShape {
    pub size: f64,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub location: Position,
    #[serde(default)]
    pub occluded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    pub arena: ShapeSpec,
    #[serde(default)]
    pub occlusions: Vec<ShapeSpec>,
    #[serde(default)]
    pub cell_shape: Option<CellShape>,
    #[serde(default)]
    pub cells: Vec<Cell>,
    /// `paths[src][dst]` is the next cell from `src` towards `dst`.
    #[serde(default)]
    pub paths: Option<Vec<Vec<Option<usize>>>>,
    /// Used to build `paths` when they are not given.
    #[serde(default)]
    pub adjacency: Option<Vec<Vec<usize>>>,
    #[serde(default)]
    pub cell_visibility: Vec<Vec<usize>>,
    #[serde(default)]
    pub cell_groups: BTreeMap<String, Vec<usize>>,
}

impl WorldData {
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let world: Self = serde_json::from_str(json)?;
        world.validate()?;
        Ok(world)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let world = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            cells = world.cells.len(),
            occlusions = world.occlusions.len() + world.occluded_cells().count(),
            "world loaded"
        );
        Ok(world)
    }

    fn validate(&self) -> Result<(), WorldError> {
        let cells = self.cells.len();
        if self.cell_shape.is_none() && self.occluded_cells().next().is_some() {
            return Err(WorldError::MissingCellShape);
        }
        if let Some(adjacency) = &self.adjacency {
            for (cell, neighbours) in adjacency.iter().enumerate() {
                if let Some(neighbour) = neighbours.iter().find(|n| **n >= cells) {
                    return Err(WorldError::InvalidAdjacency {
                        cell,
                        neighbour: *neighbour,
                    });
                }
            }
        }
        for (group, members) in &self.cell_groups {
            if let Some(cell) = members.iter().find(|c| **c >= cells) {
                return Err(WorldError::InvalidGroup {
                    group: group.clone(),
                    cell: *cell,
                });
            }
        }
        Ok(())
    }

    fn occluded_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().filter(|c| c.occluded)
    }

    pub fn arena(&self) -> Result<Polygon, WorldError> {
        Ok(self.arena.polygon()?)
    }

    /// Listed occlusions followed by one hexagon per occluded cell.
    pub fn occlusions(&self) -> Result<Vec<Polygon>, WorldError> {
        let mut occlusions = self
            .occlusions
            .iter()
            .map(ShapeSpec::polygon)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(shape) = self.cell_shape {
            for cell in self.occluded_cells() {
                let rotation = self.arena.rotation() + shape.rotation;
                occlusions.push(make_hexagon(cell.location, shape.size, rotation)?);
            }
        }
        Ok(occlusions)
    }

    /// Cell locations, `None` for occluded cells.
    pub fn locations(&self) -> Vec<Option<Position>> {
        self.cells
            .iter()
            .map(|c| (!c.occluded).then_some(c.location))
            .collect()
    }

    pub fn open_locations(&self) -> Vec<Position> {
        self.locations().into_iter().flatten().collect()
    }

    /// Locations of a named group of cells, such as `spawn_locations` or `lppo`.
    pub fn cell_group_locations(&self, name: &str) -> Result<Vec<Position>, WorldError> {
        let members = self
            .cell_groups
            .get(name)
            .ok_or_else(|| WorldError::UnknownGroup(name.to_string()))?;
        Ok(members.iter().map(|id| self.cells[*id].location).collect())
    }

    pub fn navigation(&self) -> Result<Navigation, WorldError> {
        let paths = match (&self.paths, &self.adjacency) {
            (Some(paths), _) => paths.clone(),
            (None, Some(adjacency)) => build_next_hops(&self.open_adjacency(adjacency)),
            (None, None) => return Err(WorldError::MissingPaths),
        };
        Ok(Navigation::new(
            self.locations(),
            paths,
            self.cell_visibility.clone(),
        )?)
    }

    /// `adjacency` without the edges to or from occluded cells.
    fn open_adjacency(&self, adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
        let open = |cell: usize| self.cells.get(cell).is_some_and(|c| !c.occluded);
        adjacency
            .iter()
            .enumerate()
            .map(|(cell, neighbours)| {
                if !open(cell) {
                    return vec![];
                }
                neighbours.iter().copied().filter(|n| open(*n)).collect()
            })
            .collect()
    }

    /// An empty model of this world.
    pub fn model(&self, config: ModelConfig) -> Result<Model, WorldError> {
        Ok(Model::new(self.arena()?, self.occlusions()?, config)?)
    }
}

/// Next-hop table of the shortest paths over a directed adjacency list.
///
/// Every destination gets a breadth-first search over the reversed edges. The next hop of a cell
/// is then the first entry of its own neighbour list that is one step closer to the destination,
/// so ties between equally short paths go to the neighbour listed first. `paths[cell][cell]` is
/// `cell` itself and unreachable destinations are `None`. Unknown cell ids in `adjacency` are
/// ignored.
pub fn build_next_hops(adjacency: &[Vec<usize>]) -> Vec<Vec<Option<usize>>> {
    let cells = adjacency.len();
    let mut incoming = vec![Vec::new(); cells];
    for (src, neighbours) in adjacency.iter().enumerate() {
        for &dst in neighbours.iter().filter(|n| **n < cells) {
            incoming[dst].push(src);
        }
    }

    let mut paths = vec![vec![None; cells]; cells];
    let mut queue = VecDeque::new();
    for goal in 0..cells {
        let mut hops = vec![None; cells];
        hops[goal] = Some(0_usize);
        queue.push_back(goal);
        while let Some(cell) = queue.pop_front() {
            let next = hops[cell].map(|h| h + 1);
            for &previous in &incoming[cell] {
                if hops[previous].is_none() {
                    hops[previous] = next;
                    queue.push_back(previous);
                }
            }
        }

        for cell in 0..cells {
            paths[cell][goal] = match hops[cell] {
                Some(0) => Some(cell),
                Some(h) => adjacency[cell]
                    .iter()
                    .copied()
                    .find(|n| hops.get(*n) == Some(&Some(h - 1))),
                None => None,
            };
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    /// Five cells in a row, the middle one occluded, plus a spur above cell 0.
    const WORLD: &str = r#"{
        "arena": [[-1, -1], [5, -1], [5, 3], [-1, 3]],
        "occlusions": [{ "hexagon": { "center": [4, 2], "size": 0.4 } }],
        "cell_shape": { "size": 0.5 },
        "cells": [
            { "location": [0, 0] },
            { "location": [1, 0] },
            { "location": [2, 0], "occluded": true },
            { "location": [3, 0] },
            { "location": [0, 1] }
        ],
        "adjacency": [[1, 4], [0, 2], [], [2], [0]],
        "cell_visibility": [[1, 4], [0, 4], [], [], [0, 1]],
        "cell_groups": { "spawn_locations": [3], "lppo": [1, 4] }
    }"#;

    #[test]
    fn test_shapes() {
        let world = WorldData::from_json(WORLD).unwrap();
        assert_abs_diff_eq!(world.arena().unwrap().area(), 24.0);
        let occlusions = world.occlusions().unwrap();
        assert_eq!(occlusions.len(), 2);
        assert_abs_diff_eq!(occlusions[1].centroid().x(), 2.0, epsilon = 1e-12);
        assert!(occlusions[1].contains_point(Position::new(2.4, 0.0)));
    }

    #[test]
    fn test_occluded_cells_follow_arena_rotation() {
        let json = r#"{
            "arena": { "hexagon": { "center": [0, 0], "size": 10, "rotation": 30 } },
            "cell_shape": { "size": 1, "rotation": 15 },
            "cells": [{ "location": [2, 0], "occluded": true }]
        }"#;
        let occlusions = WorldData::from_json(json).unwrap().occlusions().unwrap();
        let first = occlusions[0].vertices()[0];
        assert_abs_diff_eq!(first.x(), 2.0 + 45.0_f64.to_radians().cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(first.y(), 45.0_f64.to_radians().sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_cell_groups() {
        let world = WorldData::from_json(WORLD).unwrap();
        assert_eq!(
            world.cell_group_locations("lppo").unwrap(),
            vec![Position::new(1.0, 0.0), Position::new(0.0, 1.0)]
        );
        assert_eq!(
            world.cell_group_locations("spawn_locations").unwrap(),
            vec![Position::new(3.0, 0.0)]
        );
        assert!(matches!(
            world.cell_group_locations("exits"),
            Err(WorldError::UnknownGroup(name)) if name == "exits"
        ));
        assert_eq!(world.open_locations().len(), 4);
    }

    #[test]
    fn test_navigation_from_adjacency() {
        let navigation = WorldData::from_json(WORLD).unwrap().navigation().unwrap();
        assert_eq!(navigation.next_cell(4, 1), Ok(Some(0)));
        assert_eq!(navigation.next_cell(1, 4), Ok(Some(0)));
        assert_eq!(navigation.next_cell(0, 3), Ok(None));
        assert_eq!(
            navigation.next_step(Position::new(0.1, 0.9), Position::new(0.9, 0.1)),
            Ok(Some(Position::new(0.0, 0.0)))
        );
        assert_eq!(navigation.is_visible(4, 1), Ok(true));
        assert_eq!(navigation.is_visible(3, 0), Ok(false));
    }

    #[test]
    fn test_explicit_paths_take_precedence() {
        let json = r#"{
            "arena": [[0, 0], [2, 0], [1, 2]],
            "cells": [{ "location": [0.5, 0.5] }, { "location": [1.5, 0.5] }],
            "paths": [[0, 1], [0, 1]],
            "adjacency": [[], []]
        }"#;
        let navigation = WorldData::from_json(json).unwrap().navigation().unwrap();
        assert_eq!(navigation.next_cell(0, 1), Ok(Some(1)));
    }

    #[test]
    fn test_model() {
        let world = WorldData::from_json(WORLD).unwrap();
        let model = world.model(ModelConfig::default()).unwrap();
        assert_eq!(model.occlusions().len(), 2);
        assert_eq!(model.visibility().walls().len(), 4 + 12);
    }

    #[rstest]
    #[case::missing_paths(
        r#"{ "arena": [[0, 0], [1, 0], [0, 1]], "cells": [{ "location": [0.2, 0.2] }] }"#
    )]
    #[case::degenerate_arena(r#"{ "arena": [[0, 0], [1, 0], [2, 0]], "adjacency": [] }"#)]
    fn test_unusable_world(#[case] json: &str) {
        let world = WorldData::from_json(json).unwrap();
        assert!(world.navigation().is_err() || world.model(ModelConfig::default()).is_err());
    }

    #[rstest]
    #[case::occluded_without_shape(
        r#"{ "arena": [[0, 0], [1, 0], [0, 1]], "cells": [{ "location": [0.2, 0.2], "occluded": true }] }"#
    )]
    #[case::bad_adjacency(
        r#"{ "arena": [[0, 0], [1, 0], [0, 1]], "cells": [{ "location": [0.2, 0.2] }], "adjacency": [[3]] }"#
    )]
    #[case::bad_group(
        r#"{ "arena": [[0, 0], [1, 0], [0, 1]], "cell_groups": { "lppo": [0] } }"#
    )]
    #[case::bad_shape(r#"{ "arena": { "circle": 1 } }"#)]
    fn test_invalid_world(#[case] json: &str) {
        assert!(WorldData::from_json(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            WorldData::load("does/not/exist.json"),
            Err(WorldError::Io { .. })
        ));
    }

    #[test]
    fn test_adjacency_through_occluded_cell() {
        // The only link between the outer cells runs through the occluded middle one.
        let json = r#"{
            "arena": [[-1, -1], [3, -1], [3, 1], [-1, 1]],
            "cell_shape": { "size": 0.4 },
            "cells": [
                { "location": [0, 0] },
                { "location": [1, 0], "occluded": true },
                { "location": [2, 0] }
            ],
            "adjacency": [[1], [0, 2], [1]]
        }"#;
        let navigation = WorldData::from_json(json).unwrap().navigation().unwrap();
        assert_eq!(navigation.next_cell(0, 2), Ok(None));
        assert_eq!(
            navigation.next_step(Position::new(0.0, 0.0), Position::new(2.0, 0.0)),
            Ok(None)
        );
    }

    #[test]
    fn test_build_next_hops_prefers_first_listed_neighbour() {
        // Both 1 and 2 lead to 3 in one step; 0 lists 2 first.
        let paths = build_next_hops(&[vec![2, 1], vec![3], vec![3], vec![]]);
        assert_eq!(paths[0][3], Some(2));
        let paths = build_next_hops(&[vec![1, 2], vec![3], vec![3], vec![]]);
        assert_eq!(paths[0][3], Some(1));
    }

    #[test]
    fn test_build_next_hops() {
        // 0 -> 1 -> 2 and a shortcut 0 -> 2, plus an isolated cell 3.
        let paths = build_next_hops(&[vec![1, 2], vec![2], vec![], vec![]]);
        assert_eq!(
            paths,
            vec![
                vec![Some(0), Some(1), Some(2), None],
                vec![None, Some(1), Some(2), None],
                vec![None, None, Some(2), None],
                vec![None, None, None, Some(3)],
            ]
        );
    }
}
