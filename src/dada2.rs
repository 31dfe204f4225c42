//! Functionality related to the `amptk dada2` subcommand.

pub mod chimera;
pub mod clusters;
pub mod command;
pub mod denoise;
pub mod reads;
