// lx - core/mod.rs
//
// Core business logic layer.
// Dependencies: util, plus pure data crates (serde, regex, chrono, csv).
// Must NOT depend on: app, platform, or any clipboard/terminal I/O.

pub mod classifier;
pub mod export;
pub mod filter;
pub mod model;
pub mod signal;
