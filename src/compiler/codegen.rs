//! The code generator walks the AST once, depth first, and emits NASM
//! x86-64 assembly for Linux.
//!
//! Evaluation uses the hardware stack: every expression leaves exactly one
//! value pushed. The generator tracks how many values are live in `depth`;
//! a variable's slot is the depth at which its initializer was pushed, so
//! the address of a slot at any later point is
//! `rsp + (depth - offset) * WORD_SIZE`.

use std::collections::HashMap;

use super::ast::*;
use super::error::{CompileError, CompileResult};

const WORD_SIZE: usize = 8;

struct Symbol {
    /// Stack depth at which the binding's value was pushed.
    offset: usize,
    ty: Type,
}

pub struct Codegen {
    out: String,
    vars: HashMap<String, Symbol>,
    depth: usize,
    loop_count: usize,
}

impl Codegen {
    pub fn new() -> Self {
        Codegen {
            out: String::new(),
            vars: HashMap::new(),
            depth: 0,
            loop_count: 0,
        }
    }

    /// Generate the whole program, consuming the generator and returning
    /// the assembly text. A trailing exit-0 sequence closes every program.
    pub fn run(mut self, program: &Program) -> CompileResult<String> {
        self.emit("global _start");
        self.emit("_start:");
        for statement in program {
            self.statement(statement)?;
        }
        self.emit("    mov rax, 60");
        self.emit("    mov rdi, 0");
        self.emit("    syscall");
        Ok(self.out)
    }

    fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn push_imm(&mut self, value: i64) {
        self.emit(&format!("    mov r8, {}", value));
        self.emit("    push r8");
        self.depth += 1;
    }

    fn push_reg(&mut self, reg: &str) {
        self.emit(&format!("    push {}", reg));
        self.depth += 1;
    }

    fn pop(&mut self, reg: &str) {
        self.emit(&format!("    pop {}", reg));
        self.depth -= 1;
    }

    /// Byte distance from the current stack top to the slot pushed at
    /// `offset`. Must be computed at emission time: it depends on how many
    /// values are on the stack right now.
    fn slot_distance(&self, offset: usize) -> usize {
        (self.depth - offset) * WORD_SIZE
    }

    fn lookup(&self, name: &str) -> CompileResult<(usize, Type)> {
        match self.vars.get(name) {
            Some(symbol) => Ok((symbol.offset, symbol.ty)),
            None => Err(CompileError::Undeclared {
                name: name.to_owned(),
            }),
        }
    }

    fn statement(&mut self, statement: &Statement) -> CompileResult<()> {
        match statement {
            Statement::Declare { name, ty, value } => self.declare(name, *ty, value),
            Statement::Assign { name, value } => {
                // Lowered through the expression form, which leaves the
                // written value pushed; popping it makes the statement
                // stack-neutral.
                let term = Term::Assign {
                    name: name.clone(),
                    value: Box::new(value.clone()),
                };
                self.term(&term)?;
                self.pop("r8");
                Ok(())
            }
            Statement::Exit(code) => {
                self.expression(code)?;
                self.pop("rdi");
                self.emit("    mov rax, 60");
                self.emit("    syscall");
                Ok(())
            }
            Statement::RawAsm(text) => {
                self.emit("");
                self.emit("    ;; Start raw assembly instructions");
                self.emit(text);
                self.emit("    ;; End raw assembly instructions");
                Ok(())
            }
            Statement::Loop { condition, body } => self.tenpo(condition, body),
        }
    }

    fn declare(&mut self, name: &str, ty: Type, value: &Expression) -> CompileResult<()> {
        if self.vars.contains_key(name) {
            return Err(CompileError::DuplicateDeclaration {
                name: name.to_owned(),
            });
        }
        self.expression(value)?;
        // The initializer's value on the stack is the binding's slot.
        self.vars.insert(
            name.to_owned(),
            Symbol {
                offset: self.depth,
                ty,
            },
        );
        Ok(())
    }

    /// Assignment as an expression: evaluate, overwrite the slot in place,
    /// re-push the written value.
    fn assign(&mut self, name: &str, value: &Expression) -> CompileResult<()> {
        let (offset, ty) = self.lookup(name)?;
        if ty.awen {
            return Err(CompileError::AssignToAwen {
                name: name.to_owned(),
            });
        }
        self.expression(value)?;
        self.pop("r8");
        let distance = self.slot_distance(offset);
        self.emit("    mov r9, rsp");
        self.emit(&format!("    add r9, {}", distance));
        self.emit("    mov [r9], r8");
        self.push_reg("r8");
        Ok(())
    }

    fn expression(&mut self, expression: &Expression) -> CompileResult<()> {
        match expression {
            Expression::Term(term) => self.term(term),
            Expression::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
        }
    }

    fn term(&mut self, term: &Term) -> CompileResult<()> {
        match term {
            Term::Number(value) => {
                self.push_imm(*value);
                Ok(())
            }
            Term::Name(name) => {
                let (offset, _) = self.lookup(name)?;
                let distance = self.slot_distance(offset);
                self.emit("    mov r8, rsp");
                self.emit(&format!("    add r8, {}", distance));
                self.emit("    mov r8, [r8]");
                self.push_reg("r8");
                Ok(())
            }
            Term::Assign { name, value } => self.assign(name, value),
            Term::Str(_) => Err(CompileError::Unsupported {
                what: "a string literal outside 'asen'".to_owned(),
            }),
        }
    }

    fn binary(&mut self, op: BinOp, lhs: &Expression, rhs: &Expression) -> CompileResult<()> {
        self.expression(lhs)?;
        self.expression(rhs)?;
        match op {
            BinOp::Add => {
                self.pop("r9");
                self.pop("r8");
                self.emit("    add r8, r9");
                self.push_reg("r8");
            }
            BinOp::Sub => {
                self.pop("r9");
                self.pop("r8");
                self.emit("    sub r8, r9");
                self.push_reg("r8");
            }
            BinOp::Mul => {
                self.pop("r8");
                self.pop("rax");
                self.emit("    mov rdx, 0");
                self.emit("    mul r8");
                self.push_reg("rax");
            }
            BinOp::Div => {
                self.pop("r8");
                self.pop("rax");
                self.emit("    mov rdx, 0");
                self.emit("    div r8");
                self.push_reg("rax");
            }
            BinOp::Gt => self.compare("jg"),
            BinOp::Eq => self.compare("je"),
            BinOp::Lt => self.compare("jl"),
        }
        Ok(())
    }

    /// Pops both operands and pushes 1 or 0. A speculative 1 is pushed
    /// before the test; the fall-through path replaces it with 0. Net
    /// effect is exactly one pushed value on either branch.
    fn compare(&mut self, jump: &str) {
        self.pop("r9");
        self.pop("r8");
        self.emit("    push 1");
        self.emit("    cmp r8, r9");
        self.emit(&format!("    {} $+6", jump));
        self.emit("    pop r8");
        self.emit("    push 0");
        self.depth += 1;
    }

    fn tenpo(&mut self, condition: &Expression, body: &[Statement]) -> CompileResult<()> {
        // Labels come off a monotone counter, so nested and sequential
        // loops never collide.
        let label = self.loop_count;
        self.loop_count += 1;
        self.emit(&format!(".loopin{}:", label));
        self.expression(condition)?;
        self.pop("rcx");
        self.emit("    cmp rcx, 0");
        self.emit(&format!("    je .loopout{}", label));
        for statement in body {
            self.statement(statement)?;
        }
        self.emit(&format!("    jmp .loopin{}", label));
        self.emit(&format!(".loopout{}:", label));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::compile;
    use super::super::lexer::tokenize;
    use super::super::parser::Parser;
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(tokenize(source)).run().unwrap()
    }

    fn nanpa() -> Type {
        Type {
            base: BaseType::Nanpa,
            awen: false,
        }
    }

    #[test]
    fn test_declaration_reads_back() {
        let out = compile("o x li nanpa = 7;\notawa x;").unwrap();
        assert_eq!(
            out,
            "global _start\n\
             _start:\n\
             \x20   mov r8, 7\n\
             \x20   push r8\n\
             \x20   mov r8, rsp\n\
             \x20   add r8, 0\n\
             \x20   mov r8, [r8]\n\
             \x20   push r8\n\
             \x20   pop rdi\n\
             \x20   mov rax, 60\n\
             \x20   syscall\n\
             \x20   mov rax, 60\n\
             \x20   mov rdi, 0\n\
             \x20   syscall\n"
        );
    }

    #[test]
    fn test_slot_distance_accounts_for_later_pushes() {
        // y is pushed above x, so reading x from under y needs one word of
        // distance while y itself sits on top.
        let out = compile("o x li nanpa = 1;\no y li nanpa = 2;\notawa x;").unwrap();
        assert!(out.contains("    add r8, 8"), "output was:\n{}", out);
    }

    #[test]
    fn test_comparison_pushes_exactly_one_value() {
        let mut gen = Codegen::new();
        let program = parse("otawa 1 < 2;");
        let condition = match &program[0] {
            Statement::Exit(expression) => expression.clone(),
            other => panic!("expected otawa, got {:?}", other),
        };
        match condition {
            Expression::Binary { op, lhs, rhs } => {
                gen.binary(op, &lhs, &rhs).unwrap();
            }
            other => panic!("expected a comparison, got {:?}", other),
        }
        assert_eq!(gen.depth, 1);
        assert!(gen.out.contains("    push 1"));
        assert!(gen.out.contains("    push 0"));
        assert!(gen.out.contains("    jl $+6"));
    }

    #[test]
    fn test_each_comparison_uses_its_own_jump() {
        for (source, jump) in &[
            ("otawa 1 > 2;", "jg"),
            ("otawa 1 == 2;", "je"),
            ("otawa 1 < 2;", "jl"),
        ] {
            let out = compile(source).unwrap();
            assert!(out.contains(&format!("    {} $+6", jump)), "{}", source);
        }
    }

    #[test]
    fn test_assignment_statement_is_stack_neutral() {
        let mut gen = Codegen::new();
        for statement in parse("o x li nanpa = 5;") {
            gen.statement(&statement).unwrap();
        }
        let depth_before = gen.depth;
        for statement in parse("x = x + 1;") {
            gen.statement(&statement).unwrap();
        }
        assert_eq!(gen.depth, depth_before);
    }

    #[test]
    fn test_assignment_as_expression_pushes_the_written_value() {
        let mut gen = Codegen::new();
        gen.push_imm(5);
        gen.vars.insert(
            "x".to_owned(),
            Symbol {
                offset: gen.depth,
                ty: nanpa(),
            },
        );
        let term = Term::Assign {
            name: "x".to_owned(),
            value: Box::new(Expression::Term(Term::Number(9))),
        };
        gen.term(&term).unwrap();
        assert_eq!(gen.depth, 2);
        assert!(gen.out.contains("    mov [r9], r8"));
        assert!(gen.out.ends_with("    push r8\n"));
    }

    #[test]
    fn test_duplicate_declaration_fails() {
        assert_eq!(
            compile("o x li nanpa = 1;\no x li nanpa = 2;"),
            Err(CompileError::DuplicateDeclaration {
                name: "x".to_owned()
            })
        );
    }

    #[test]
    fn test_undeclared_identifier_fails() {
        assert_eq!(
            compile("otawa y;"),
            Err(CompileError::Undeclared {
                name: "y".to_owned()
            })
        );
        assert_eq!(
            compile("y = 6;"),
            Err(CompileError::Undeclared {
                name: "y".to_owned()
            })
        );
        // Declarations only take effect in statement order.
        assert_eq!(
            compile("otawa x;\no x li nanpa = 1;"),
            Err(CompileError::Undeclared {
                name: "x".to_owned()
            })
        );
    }

    #[test]
    fn test_assigning_to_awen_fails() {
        assert_eq!(
            compile("o x li nanpa awen = 5;\nx = 6;"),
            Err(CompileError::AssignToAwen {
                name: "x".to_owned()
            })
        );
        // Without the marker the same program compiles.
        assert!(compile("o x li nanpa = 5;\nx = 6;").is_ok());
    }

    #[test]
    fn test_loop_labels_are_unique_and_increasing() {
        let out = compile(
            "o x li nanpa = 0;\n\
             tenpo x < 2 la {\n\
                 tenpo 0 la { x = x + 1; } pini\n\
                 x = x + 1;\n\
             } pini\n\
             tenpo 0 la { otawa 1; } pini\n\
             otawa x;",
        )
        .unwrap();
        for label in &[".loopin0:", ".loopin1:", ".loopin2:"] {
            assert_eq!(out.matches(label).count(), 1, "{}", label);
        }
        assert!(!out.contains(".loopin3"));
        // The outer loop opens first, the sequential loop numbers last.
        let first = out.find(".loopin0:").unwrap();
        let inner = out.find(".loopin1:").unwrap();
        let last = out.find(".loopin2:").unwrap();
        assert!(first < inner && inner < last);
    }

    #[test]
    fn test_false_loop_condition_jumps_past_the_body() {
        let out = compile("tenpo 0 la { otawa 1; } pini\notawa 9;").unwrap();
        let test = out.find("    je .loopout0").unwrap();
        let body_exit = out.find("    pop rdi").unwrap();
        assert!(test < body_exit);
        assert!(out.contains(".loopout0:"));
    }

    #[test]
    fn test_multiplication_generated_before_addition() {
        // 2 + 3 * 4: the multiplicative subtree sits on the right and must
        // be fully evaluated before the addition folds the stack.
        let out = compile("o x li nanpa = 2 + 3 * 4;\notawa x;").unwrap();
        let mul = out.find("    mul r8").unwrap();
        let add = out.find("    add r8, r9").unwrap();
        assert!(mul < add);
    }

    #[test]
    fn test_raw_assembly_passes_through_verbatim() {
        let out = compile("asen \"    xor rax, rax\n    inc rax\";\notawa 0;").unwrap();
        assert!(out.contains("    ;; Start raw assembly instructions\n"));
        assert!(out.contains("    xor rax, rax\n    inc rax\n"));
        assert!(out.contains("    ;; End raw assembly instructions\n"));
    }

    #[test]
    fn test_string_initializer_is_rejected() {
        assert!(matches!(
            compile("o s li linja = \"hi\";"),
            Err(CompileError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_output_is_deterministic() {
        let source = "o x li nanpa = 3;\n\
                      tenpo x > 0 la { x = x - 1; } pini\n\
                      otawa x;";
        assert_eq!(compile(source).unwrap(), compile(source).unwrap());
    }
}
