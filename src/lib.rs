//! Ancestral biogeography reconstruction on phylogenetic trees.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
