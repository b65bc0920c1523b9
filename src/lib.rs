pub mod application;
pub mod config;
pub mod domain;
pub mod io;
pub mod logging;
pub mod storage;

pub use domain::*;
pub use storage::{EntityStore, Store};
