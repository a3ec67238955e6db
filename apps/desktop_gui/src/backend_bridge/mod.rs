//! Queue and worker thread between the egui loop and the async client.

pub mod commands;
pub mod runtime;
