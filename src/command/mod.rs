//! Line-oriented command language for the interactive shell
//!
//! `parser` turns one input line into a [`Command`]; [`Session`] runs it
//! against a storage file and its log.

mod error;
mod parser;
mod session;

#[cfg(test)]
mod tests;

pub use error::{CommandError, CommandResult};
pub use parser::{Command, Selectors, parse, parser};
pub use session::{Output, Session};
