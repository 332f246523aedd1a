pub mod config;
pub mod control_plane;
pub mod differ;
pub mod errors;
pub mod models;
pub mod nrcs;
pub mod observability;
pub mod rank;
pub mod resolver;
pub mod supervisor;
pub mod watcher;
