//! IO module - configuration files and evaluator setup.

mod config;
mod setup;

pub use config::{read_config, write_input, ListConfig, OrbitalConfig, RunConfig};
pub use setup::{build_evaluator, load_orbitals, show_info, system_frame};
