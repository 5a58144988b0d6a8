// lx - platform/mod.rs
//
// Platform abstraction layer: config directory, filesystem input,
// system clipboard, terminal detection.
// Dependencies: util, core::model (InputOrigin), directories, memmap2, arboard.
// Must NOT depend on: app.

pub mod clipboard;
pub mod config;
pub mod fs;
pub mod input;
