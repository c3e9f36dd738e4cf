//! Reply Bot - A Reddit bot that answers comments matching a pattern.
//!
//! This library provides the configuration, Reddit client and reply pipeline
//! for the bot. The binary wires them together.

pub mod bot;
pub mod config;
pub mod filter;
pub mod reddit;
pub mod types;

#[cfg(test)]
mod test_utils;
