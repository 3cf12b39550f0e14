//! Headless simulation of agents moving through a polygonal arena with occlusions.


pub mod config;
pub mod domain;
pub mod world;
