// lx - lib.rs
//
// Library entry point, exposing every layer for integration testing and
// for the command-line driver in `main.rs`.

pub mod app;
pub mod core;
pub mod driver;
pub mod platform;
pub mod util;
