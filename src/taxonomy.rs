//! Taxonomy assignment for clustered OTUs.

pub mod annotate;
pub mod command;
pub mod global;
pub mod method;
pub mod output;
pub mod parse;
pub mod ranks;
pub mod reconcile;
