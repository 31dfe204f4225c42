//! Utilities that are used across the `amptk` subcommands.

pub mod args;
pub mod display;
pub mod formats;
pub mod pathbuf;
pub mod sort;
pub mod tools;
