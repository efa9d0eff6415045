//! Translates Hack VM commands into symbolic Hack assembly.
//!
//! Each source file becomes a [`linker::Unit`]; [`linker::link`] turns a list
//! of units into one assembly program, optionally preceded by a bootstrap that
//! sets up the stack and calls `Sys.init`.

extern crate nom;

pub mod ast;
pub mod error;
pub mod labels;
pub mod linker;
pub mod parser;
pub mod segments;
pub mod translator;

#[cfg(test)]
mod emulator;

pub use error::{Error, Result};
pub use linker::{link, translate_sources, Bootstrap, Linker, Options, Unit};
