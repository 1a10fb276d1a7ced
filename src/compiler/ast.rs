//! This AST describes a parsed ln program.
//!
//! An ln source file is an ordered sequence of statements. Statements are
//! terminated by semicolons, except for `tenpo` loops which carry their own
//! body delimited by `la` and `pini`. Comments are prefixed with `//` and
//! are single-line only.
//!
//! Supported statements:
//!
//! ```text
//! o x li nanpa = 5;        // declare x as a number
//! o y li awen nanpa = 2;   // awen marks the binding immutable
//! x = x + 1;               // reassign a mutable binding
//! otawa x;                 // exit the process with code x
//! asen "    nop";          // paste raw assembly into the output
//! tenpo x < 10 la {        // loop while the condition is nonzero
//!     x = x + 1;
//! } pini
//! ```
//!
//! Expressions combine terms with `+ - * /` and the comparisons `> == <`,
//! parsed by precedence climbing: comparisons bind loosest, then additive,
//! then multiplicative, all left-associative.

/// Binding precedence of a binary operator, loosest first.
///
/// The parser climbs these tiers: having consumed an operator of tier `t`,
/// it parses the right-hand side with a minimum tier of `t + 1`, which makes
/// same-tier chains fold to the left.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Precedence {
    Comparing = 1,
    Linear = 2,
    Scaling = 3,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Eq,
    Lt,
}

impl BinOp {
    pub fn precedence(&self) -> Precedence {
        use BinOp::*;
        match self {
            Gt | Eq | Lt => Precedence::Comparing,
            Add | Sub => Precedence::Linear,
            Mul | Div => Precedence::Scaling,
        }
    }
}

/// An expression with no binary operator at its root.
#[derive(Clone, PartialEq, Debug)]
pub enum Term {
    Number(i64),
    /// A read of a previously declared binding.
    Name(String),
    Str(String),
    /// Assignment as an expression, yielding the assigned value. The parser
    /// never builds this variant directly; the generator lowers assignment
    /// statements through it.
    Assign { name: String, value: Box<Expression> },
}

#[derive(Clone, PartialEq, Debug)]
pub enum Expression {
    Term(Term),
    Binary {
        op: BinOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

/// Base types the grammar names. Only `Nanpa` and `Linja` have a
/// construction path in the parser today; the rest are reserved spellings
/// the lexer already accepts.
#[allow(dead_code)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BaseType {
    Nanpa,
    NanpaLili,
    NanpaSuli,
    Telo,
    TeloLili,
    TeloSuli,
    Sitelen,
    Linja,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Type {
    pub base: BaseType,
    /// `awen` bindings reject reassignment at generation time.
    pub awen: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Statement {
    /// `o name li <type> = <expr>;`
    Declare {
        name: String,
        ty: Type,
        value: Expression,
    },
    /// `name = <expr>;`
    Assign { name: String, value: Expression },
    /// `otawa <expr>;`
    Exit(Expression),
    /// `asen "<text>";`, emitted into the output verbatim.
    RawAsm(String),
    /// `tenpo <expr> la { <statements> } pini`
    Loop {
        condition: Expression,
        body: Vec<Statement>,
    },
}

pub type Program = Vec<Statement>;
