//! Binary-side plumbing: config file, console output, signals, terminal setup.

pub(crate) mod config;
pub(crate) mod console;
pub(crate) mod interrupt;
pub(crate) mod terminal;
