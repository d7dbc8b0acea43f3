//! A Markov-chain possession model for projecting basketball games.
//! Rates players from possession-level history, builds calibrated transition matrices per team,
//! adjusts them for home court and simulates games to derive team metrics and player box scores.

#![allow(clippy::too_many_arguments)]

pub mod aggregate;
pub mod apportion;
pub mod baseline;
pub mod data;
pub mod file;
pub mod hca;
pub mod linear;
pub mod mc;
pub mod metric;
pub mod model;
pub mod pace;
pub mod print;
pub mod probs;
pub mod rating;
pub mod roster;
pub mod state;
pub mod timed;
pub mod transition;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
