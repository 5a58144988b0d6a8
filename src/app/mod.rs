// lx - app/mod.rs
//
// Application layer: state machine, command dispatch, background ingestion,
// multi-workspace session.
// Dependencies: core, util.
// Must NOT depend on: platform. Side effects leave this layer as `Effect`
// values executed by the caller.

pub mod command;
pub mod ingest;
pub mod state;
pub mod workspace;
