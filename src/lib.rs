//! Attack tree modelling: a typed threat/countermeasure graph with
//! structural validation, simple/extended conversion, XML documents and
//! automatic layout.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod layout;
pub mod util;
