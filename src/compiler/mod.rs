//! The compiler module turns ln source text into x86-64 NASM assembly.
//!
//! It does this in three strictly sequential passes: a tokenizer, a
//! recursive descent parser with precedence climbing for expressions, and
//! a single-walk code generator with a flat symbol table.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;

use self::error::CompileResult;

/// Compile a whole source file to assembly text.
///
/// The first parse or generation error aborts compilation; partial output
/// is never returned.
pub fn compile(source: &str) -> CompileResult<String> {
    let tokens = lexer::tokenize(source);
    let program = parser::Parser::new(tokens).run()?;
    codegen::Codegen::new().run(&program)
}
