// Copyright (c) 2022 Bastiaan Marinus van de Weerd

//! Backtracking solver for grid transport puzzles: a train lays track
//! tile-by-tile through a bounded grid, ferrying aliens to matching houses,
//! and must reach the exit with every passenger delivered. The search is
//! depth-first with two tiers of dead-end pruning: a cheap region
//! connectivity check on every step, and an exact vertex-disjoint-path
//! check on an adaptive schedule with bisection rollback.

pub mod map;
pub mod reach;
pub mod search;
pub mod step;

pub use map::{parsing::MapError, Color, Facing, GridMap, Tile};
pub use search::{Solver, Tick};
pub use step::{Car, Step};
