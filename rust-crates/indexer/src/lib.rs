pub mod app;

pub mod reconcile;

pub mod snapshot;

pub mod tiles;

pub mod world;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
