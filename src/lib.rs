//! `amptk` is a command line tool for amplicon metagenomics. It assigns
//! taxonomy to OTU tables and runs the DADA2 denoising pipeline, driving
//! external tools such as `usearch`, `vsearch` and `Rscript` along the way.
//! This package is composed of both a library crate, as well as a binary
//! crate.
//!
//! This documentation generally refers to the library crate documentation for
//! use by developers of `amptk`.
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]

pub mod dada2;
pub mod taxonomy;
pub mod utils;
