//! Error types shared by the parser and the code generator.
//!
//! Every error here is fatal: compilation stops at the first one and the
//! driver reports a single diagnostic before exiting nonzero. There is no
//! recovery and no partial output worth keeping.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A construct was malformed; `message` names the missing element.
    #[snafu(display("syntax error on line {}: {}", line, message))]
    Syntax { message: String, line: usize },

    /// End of input was reached inside a `tenpo` body, before `pini`.
    #[snafu(display("reached end of input inside 'tenpo' starting on line {}", line))]
    UnterminatedLoop { line: usize },

    /// An identifier was referenced before any declaration introduced it.
    #[snafu(display("undeclared identifier '{}'", name))]
    Undeclared { name: String },

    /// A name was declared twice in the flat scope. Shadowing is not a thing.
    #[snafu(display("duplicate declaration of '{}'", name))]
    DuplicateDeclaration { name: String },

    /// Assignment to a binding declared with the `awen` marker.
    #[snafu(display("cannot assign to '{}': it is marked awen", name))]
    AssignToAwen { name: String },

    /// The generator received an expression shape it cannot lower.
    #[snafu(display("cannot generate code for {}", what))]
    Unsupported { what: String },
}
