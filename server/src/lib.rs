//! Herdbook breeding lifecycle engine.
//!
//! Tracks breedings of a farm's animals from mating through pregnancy
//! confirmation to birth, links offspring to their parents, and derives
//! the past-due and upcoming birth views a farm works from.

pub mod backend;
