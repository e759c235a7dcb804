//! Declarative command line argument parsers.
//!
//! A schema class describes its arguments as plain fields; `dflags` turns
//! that description into a configured parser and parsed command lines back
//! into instances of the class:
//!
//! ```
//! dflags::dflags! {
//!     /// Fetch a URL.
//!     struct Fetch {
//!         url: String,
//!         retries: u32 = 3,
//!         verbose: bool,
//!     }
//! }
//!
//! let fetch: Fetch = dflags::parse_from(
//!     vec!["--url".into(), "https://example.com".into()],
//! ).unwrap();
//! assert_eq!(fetch.url, "https://example.com");
//! assert_eq!(fetch.retries, 3);
//! assert!(!fetch.verbose);
//! ```
//!
//! Schema mistakes (an unsupported field type, colliding flag tokens,
//! contradictory metadata) are [`SchemaError`]s and surface when the parser
//! is built, before any input is read. Malformed user input is an [`Error`]
//! and follows the usual usage-message-plus-nonzero-exit convention via
//! [`Error::exit`].

use std::ffi::OsString;
use std::fmt;

pub use dflags_macros::dflags;

mod command;
mod convert;
mod help;
mod rt;
mod schema;
mod values;

pub use crate::command::{ArgSpec, Command};
pub use crate::convert::to_schema_source;
pub use crate::schema::{Choices, ChoiceSet, ClassSpec, Converter, FieldSpec, Member, TypeExpr};
pub use crate::values::Values;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// User input that the parser configuration rejects: a malformed value, an
/// unknown flag or sub-command, a missing required argument.
#[derive(Debug)]
pub struct Error {
    msg: String,
    help: bool,
}

impl Error {
    pub(crate) fn new(msg: String) -> Error {
        Error { msg, help: false }
    }

    pub(crate) fn help_requested(text: String) -> Error {
        Error { msg: text, help: true }
    }

    /// True when the "error" is a `--help` request rather than a failure.
    pub fn is_help(&self) -> bool {
        self.help
    }

    /// Prints the message and terminates the process: exit code 0 for a
    /// help request, 2 for a genuine parse error.
    pub fn exit(self) -> ! {
        if self.help {
            println!("{self}");
            std::process::exit(0)
        } else {
            eprintln!("{self}");
            std::process::exit(2)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.msg, f)
    }
}

impl std::error::Error for Error {}

/// A schema the parser builder rejects. Always raised while the parser
/// configuration is being built, never during parsing, so the schema author
/// sees it on the first run regardless of input.
#[derive(Debug)]
pub struct SchemaError {
    msg: String,
}

impl SchemaError {
    pub(crate) fn new(msg: String) -> SchemaError {
        SchemaError { msg }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.msg, f)
    }
}

impl std::error::Error for SchemaError {}

/// A class whose fields are visible as an ordered sequence of descriptors,
/// and which can be reconstructed from parsed values.
///
/// Implemented by the [`dflags!`] macro; hand-written impls over
/// [`ClassSpec`]'s builder methods work the same way.
pub trait Schema: Sized + 'static {
    /// Field descriptors and class-level parser metadata.
    fn class_spec() -> ClassSpec;

    /// Rebuilds an instance from parsed raw values. Values are already
    /// coerced; this only moves them into place, recursing into the chosen
    /// sub-command where the class has one.
    fn from_values(values: &mut Values) -> Result<Self>;
}

/// Parses the process arguments, terminating the process on bad input.
///
/// # Panics
///
/// Panics if `T`'s schema is invalid; see [`make_parser`] to handle
/// [`SchemaError`] instead.
pub fn parse<T: Schema>() -> T {
    try_parse().unwrap_or_else(|err| err.exit())
}

/// Parses the process arguments.
///
/// # Panics
///
/// Panics if `T`'s schema is invalid.
pub fn try_parse<T: Schema>() -> Result<T> {
    let mut args = std::env::args_os().collect::<Vec<_>>();
    if !args.is_empty() {
        args.remove(0);
    }
    parse_from(args)
}

/// Parses an explicit argument sequence, excluding the program name.
///
/// # Panics
///
/// Panics if `T`'s schema is invalid.
pub fn parse_from<T: Schema>(args: Vec<OsString>) -> Result<T> {
    let cmd = Command::cached::<T>().unwrap_or_else(|err| panic!("{err}"));
    let mut values = cmd.run(args)?;
    T::from_values(&mut values)
}

/// Builds the parser configuration for `T` without parsing anything.
pub fn make_parser<T: Schema>() -> Result<Command, SchemaError> {
    Command::of::<T>()
}

/// Registers `T`'s arguments onto a pre-existing parser configuration.
pub fn make_parser_with<T: Schema>(parser: Command) -> Result<Command, SchemaError> {
    parser.augment::<T>()
}
