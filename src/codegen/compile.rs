use std::collections::HashMap;

use crate::{
    asm::Opcode,
    codegen::{
        compile_error::CompileError,
        emit::Emitter,
        symbol::SymbolKind,
        symbol_table::{ScopeId, SymbolTable},
        weak_scope::WeakScopes,
    },
    lang::{BinaryOp, Branch, Expr, Program, Stmt, UnaryOp},
};

const BUILTINS: [&str; 3] = ["print", "input", "assert"];

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Emit `// ...` annotation lines into the assembly.
    pub comments: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions { comments: true }
    }
}

#[derive(Debug, Clone)]
struct FunctionInfo {
    params: Vec<String>,
    scope: ScopeId,
    start: String,
}

/// Tree-walking code generator for the accumulator machine.
///
/// Every expression visit emits the code that leaves its value in some cell
/// and returns that cell's label. Callers never care whether the label is a
/// literal, a variable or a temporary.
pub struct Compiler {
    symbols: SymbolTable,
    weak: WeakScopes,
    out: Emitter,

    /// Scope new variables and temporaries go into
    scope: ScopeId,

    functions: HashMap<String, FunctionInfo>,
    current_function: Option<String>,
}

/// Compile with default options.
pub fn compile(program: &Program) -> Result<String, CompileError> {
    Compiler::new(CompilerOptions::default()).compile_program(program)
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            symbols: SymbolTable::new(),
            weak: WeakScopes::new(),
            out: Emitter::new(options.comments),
            scope: ScopeId::ROOT,
            functions: HashMap::new(),
            current_function: None,
        }
    }

    /// Lower a whole program to assembly text.
    ///
    /// Layout: main code, `HLT`, function bodies, then one `DAT` per storage
    /// cell of every scope.
    pub fn compile_program(mut self, program: &Program) -> Result<String, CompileError> {
        self.hoist_functions(program)?;

        self.out.comment("main");
        for stmt in program.main() {
            self.compile_stmt(stmt)?;
        }
        self.finish_scope("main");
        self.out.op(Opcode::Hlt);

        for stmt in program.functions() {
            if let Stmt::Function { name, body, .. } = stmt {
                self.compile_function(name, body)?;
            }
        }

        self.out.comment("data");
        for line in self.symbols.emit_all_declarations() {
            self.out.raw(line);
        }

        log::debug!(
            "compiled {} words, {} temporaries, {} function(s)",
            self.out.len(),
            self.symbols.labels().temps(),
            self.functions.len()
        );

        Ok(self.out.finish())
    }

    /// Register every function before any body is compiled so calls may
    /// precede declarations.
    fn hoist_functions(&mut self, program: &Program) -> Result<(), CompileError> {
        for stmt in program.functions() {
            let Stmt::Function { name, params, .. } = stmt else {
                continue;
            };

            if BUILTINS.contains(&name.as_str()) || self.functions.contains_key(name) {
                return Err(CompileError::DuplicateFunction {
                    name: name.clone(),
                    builtin: BUILTINS.contains(&name.as_str()),
                });
            }

            let start = self
                .symbols
                .intern(ScopeId::ROOT, SymbolKind::FunctionIdentifier, name, 0);
            let scope = self.symbols.add_scope(format!("func_{}", name), ScopeId::ROOT);
            for param in params {
                self.symbols.declare_local(scope, param);
            }

            self.functions.insert(
                name.clone(),
                FunctionInfo {
                    params: params.clone(),
                    scope,
                    start,
                },
            );
        }
        Ok(())
    }

    /// Leaked loop scopes mean unbalanced enter/leave; worth a warning but
    /// the emitted code is still usable.
    fn finish_scope(&mut self, name: &str) {
        for leaked in self.weak.drain_leaked() {
            log::warn!("weak scope '{}' still open at end of {}", leaked.label, name);
        }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn compile_function(&mut self, name: &str, body: &[Stmt]) -> Result<(), CompileError> {
        let info = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::internal(format!("function '{}' was not hoisted", name)))?;

        self.scope = info.scope;
        self.current_function = Some(name.to_string());

        self.out.comment(&format!("function {}({})", name, info.params.join(", ")));
        self.out.anchor(&info.start);

        // arguments were pushed left to right
        for param in info.params.iter().rev() {
            let cell = self.variable_label(param)?;
            self.out.op(Opcode::Pop);
            self.out.op_to(Opcode::Sta, &cell);
        }

        self.compile_block(body)?;

        let zero = self.symbols.intern_literal(0);
        self.emit_return(&zero);
        self.finish_scope(name);

        self.scope = ScopeId::ROOT;
        self.current_function = None;
        Ok(())
    }

    /// Parameters are already popped, so the return address is on top.
    /// It is swapped for the result and `RET` jumps through the accumulator.
    fn emit_return(&mut self, value: &str) {
        let address = self.symbols.fresh_temp(self.scope);
        self.out.op(Opcode::Pop);
        self.out.op_to(Opcode::Sta, &address);
        self.out.op_to(Opcode::Lda, value);
        self.out.op(Opcode::Psh);
        self.out.op_to(Opcode::Lda, &address);
        self.out.op(Opcode::Ret);
    }

    /// Call a user function and return the cell holding its result.
    ///
    /// ```text
    ///     LDAPC          ; acc = address of the ADD
    ///     ADD literal_K  ; K = 3 + 2n lands on the POP below
    ///     PSH
    ///     LDA arg_i      ; n times
    ///     PSH
    ///     BRA func_f_start
    ///     POP            ; <- return point
    ///     STA result
    /// ```
    fn compile_user_call(&mut self, name: &str, args: &[Expr]) -> Result<String, CompileError> {
        let info = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::unknown_function(name))?;

        if args.len() != info.params.len() {
            return Err(CompileError::arity(name, info.params.len(), args.len()));
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.compile_expr(arg)?);
        }

        let offset = self.symbols.intern_literal(3 + 2 * args.len() as i64);
        let result = self.symbols.fresh_temp(self.scope);

        self.out.comment(&format!("call {}", name));
        self.out.op(Opcode::LdaPc);
        self.out.op_to(Opcode::Add, &offset);
        self.out.op(Opcode::Psh);
        for value in &values {
            self.out.op_to(Opcode::Lda, value);
            self.out.op(Opcode::Psh);
        }
        self.out.op_to(Opcode::Bra, &info.start);
        self.out.op(Opcode::Pop);
        self.out.op_to(Opcode::Sta, &result);

        Ok(result)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        for stmt in body {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Assign { name, value } => {
                self.out.comment(&format!("{} = ...", name));
                let value = self.compile_expr(value)?;
                let target = self.symbols.intern_variable(self.scope, name);
                self.out.copy(&value, &target);
            }

            Stmt::If {
                branches,
                otherwise,
            } => self.compile_if(branches, otherwise.as_deref())?,

            Stmt::While { condition, body } => self.compile_while(condition, body)?,

            Stmt::DoUntil { body, condition } => self.compile_do_until(body, condition)?,

            Stmt::For {
                var,
                start,
                end,
                body,
                next_var,
            } => {
                if var != next_var {
                    return Err(CompileError::ForVariableMismatch {
                        start: var.clone(),
                        end: next_var.clone(),
                    });
                }
                self.compile_for(var, start, end, body)?;
            }

            Stmt::Switch { .. } => {
                return Err(CompileError::unsupported(
                    "switch",
                    "rewrite the cases as an if/elseif/else chain",
                ));
            }

            Stmt::Function { name, .. } => {
                return Err(CompileError::internal(format!(
                    "function '{}' reached statement position",
                    name
                )));
            }

            Stmt::Return(value) => {
                if self.current_function.is_none() {
                    return Err(CompileError::ReturnOutsideFunction);
                }
                let value = match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => self.symbols.intern_literal(0),
                };
                self.emit_return(&value);
            }

            Stmt::Break => {
                let target = self
                    .weak
                    .current()
                    .map(|l| l.break_target())
                    .ok_or_else(|| CompileError::loop_control("break"))?;
                self.out.op_to(Opcode::Bra, &target);
            }

            Stmt::Continue => {
                let target = self
                    .weak
                    .current()
                    .map(|l| l.continue_target.clone())
                    .ok_or_else(|| CompileError::loop_control("continue"))?;
                self.out.op_to(Opcode::Bra, &target);
            }

            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
            }
        }
        Ok(())
    }

    /// Run `body` inside a weak scope. The scope is left even when the body
    /// fails, so the stack stays balanced.
    fn compile_loop_body(
        &mut self,
        label: &str,
        continue_target: String,
        body: &[Stmt],
    ) -> Result<(), CompileError> {
        self.weak.enter(label, continue_target);
        let result = self.compile_block(body);
        self.weak.leave();
        result
    }

    /// Leave the condition's value in the accumulator and branch to
    /// `on_false` when it is zero.
    fn branch_if_false(&mut self, condition: &Expr, on_false: &str) -> Result<(), CompileError> {
        let cond = self.compile_expr(condition)?;
        self.out.op_to(Opcode::Lda, &cond);
        self.out.op_to(Opcode::Brz, on_false);
        Ok(())
    }

    /// Each arm tests its condition and falls to the next arm on failure.
    /// Every arm body ends with a jump to the shared end label.
    fn compile_if(
        &mut self,
        branches: &[Branch],
        otherwise: Option<&[Stmt]>,
    ) -> Result<(), CompileError> {
        let id = self.symbols.fresh_if(self.scope);
        let end = format!("{}_end", id);
        let else_label = format!("{}_else", id);
        self.out.comment(&format!("if {}", id));

        for (i, branch) in branches.iter().enumerate() {
            let next = if i + 1 < branches.len() {
                format!("{}_{}", id, i + 1)
            } else if otherwise.is_some() {
                else_label.clone()
            } else {
                end.clone()
            };

            self.out.anchor(&format!("{}_{}", id, i));
            self.branch_if_false(&branch.condition, &next)?;
            self.compile_block(&branch.body)?;
            self.out.op_to(Opcode::Bra, &end);
        }

        if let Some(body) = otherwise {
            self.out.anchor(&else_label);
            self.compile_block(body)?;
        }

        self.out.anchor(&end);
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr, body: &[Stmt]) -> Result<(), CompileError> {
        let id = self.symbols.fresh_loop(self.scope);
        let start = format!("{}_start", id);
        let end = format!("{}_end", id);
        self.out.comment(&format!("while {}", id));

        self.out.anchor(&start);
        self.branch_if_false(condition, &end)?;
        self.compile_loop_body(&id, start.clone(), body)?;
        self.out.op_to(Opcode::Bra, &start);
        self.out.anchor(&end);
        Ok(())
    }

    /// The body runs once before the first test; a false condition loops.
    fn compile_do_until(&mut self, body: &[Stmt], condition: &Expr) -> Result<(), CompileError> {
        let id = self.symbols.fresh_loop(self.scope);
        let start = format!("{}_start", id);
        let check = format!("{}_cond", id);
        self.out.comment(&format!("do...until {}", id));

        self.out.anchor(&start);
        self.compile_loop_body(&id, check.clone(), body)?;
        self.out.anchor(&check);
        self.branch_if_false(condition, &start)?;
        self.out.anchor(&format!("{}_end", id));
        Ok(())
    }

    /// `var` counts up by one. The loop exits once `var - end >= 0` after a
    /// pass, so the body runs for every value from start to end inclusive.
    fn compile_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        body: &[Stmt],
    ) -> Result<(), CompileError> {
        let id = self.symbols.fresh_loop(self.scope);
        let top = format!("{}_start", id);
        let step = format!("{}_step", id);
        let exit = format!("{}_end", id);
        self.out.comment(&format!("for {} {}", var, id));

        let first = self.compile_expr(start)?;
        let counter = self.symbols.intern_variable(self.scope, var);
        self.out.copy(&first, &counter);

        // the bound is evaluated once
        let last = self.compile_expr(end)?;
        let bound = self.symbols.fresh_temp(self.scope);
        self.out.copy(&last, &bound);

        self.out.anchor(&top);
        self.compile_loop_body(&id, step.clone(), body)?;

        let one = self.symbols.intern_literal(1);
        self.out.label(&step);
        self.out.op_to(Opcode::Lda, &counter);
        self.out.op_to(Opcode::Sub, &bound);
        self.out.op_to(Opcode::Brp, &exit);
        self.out.binary(&counter, Opcode::Add, &one, &counter);
        self.out.op_to(Opcode::Bra, &top);
        self.out.anchor(&exit);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn variable_label(&self, name: &str) -> Result<String, CompileError> {
        self.symbols
            .lookup_variable(self.scope, name)
            .ok_or_else(|| CompileError::undefined(name))
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<String, CompileError> {
        match expr {
            Expr::Integer(n) => Ok(self.symbols.intern_literal(*n)),
            Expr::Bool(b) => Ok(self.symbols.intern_literal(i64::from(*b))),
            Expr::Str(_) => Err(CompileError::unsupported(
                "string value",
                "strings can only be passed to print",
            )),
            Expr::Ident(name) => self.variable_label(name),
            Expr::Group(inner) => self.compile_expr(inner),

            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                let value = self.compile_expr(operand)?;
                let zero = self.symbols.intern_literal(0);
                let result = self.symbols.fresh_temp(self.scope);
                self.out.binary(&zero, Opcode::Sub, &value, &result);
                Ok(result)
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let value = self.compile_expr(operand)?;
                let result = self.symbols.fresh_temp(self.scope);
                self.out.op_to(Opcode::Lda, &value);
                self.select(&result, Opcode::Brz, true);
                Ok(result)
            }

            Expr::Binary { left, op, right } => match op {
                BinaryOp::And => self.compile_and(left, right),
                BinaryOp::Or => self.compile_or(left, right),
                _ => {
                    let l = self.compile_expr(left)?;
                    let r = self.compile_expr(right)?;
                    self.compile_binary(*op, &l, &r)
                }
            },

            Expr::Call { name, args } => self.compile_call(name, args),
        }
    }

    fn compile_binary(&mut self, op: BinaryOp, l: &str, r: &str) -> Result<String, CompileError> {
        let result = self.symbols.fresh_temp(self.scope);

        match op {
            BinaryOp::Add => self.out.binary(l, Opcode::Add, r, &result),
            BinaryOp::Sub => self.out.binary(l, Opcode::Sub, r, &result),
            BinaryOp::Mul => self.emit_multiply(l, r, &result),
            BinaryOp::Div => self.emit_divide(l, r, &result),
            BinaryOp::Mod => self.emit_modulo(l, r, &result),
            BinaryOp::Pow => self.emit_power(l, r, &result),

            // BRP branches on >= 0, BRZ on == 0
            BinaryOp::Lt => self.compare(l, r, &result, Opcode::Brp, false),
            BinaryOp::Gt => self.compare(r, l, &result, Opcode::Brp, false),
            BinaryOp::LtEq => self.compare(r, l, &result, Opcode::Brp, true),
            BinaryOp::GtEq => self.compare(l, r, &result, Opcode::Brp, true),
            BinaryOp::Eq => self.compare(r, l, &result, Opcode::Brz, true),
            BinaryOp::NotEq => self.compare(l, r, &result, Opcode::Brz, false),

            BinaryOp::And | BinaryOp::Or => {
                return Err(CompileError::internal(format!(
                    "'{}' must be lowered with short-circuiting",
                    op
                )));
            }
        }

        Ok(result)
    }

    /// `LDA a; SUB b` then pick 0 or 1 depending on `branch`.
    fn compare(&mut self, a: &str, b: &str, result: &str, branch: Opcode, branch_means: bool) {
        self.out.op_to(Opcode::Lda, a);
        self.out.op_to(Opcode::Sub, b);
        self.select(result, branch, branch_means);
    }

    /// Store 1 or 0 into `result` depending on whether `branch` is taken on
    /// the current accumulator. `branch_means` is the value when taken.
    fn select(&mut self, result: &str, branch: Opcode, branch_means: bool) {
        let one = self.symbols.intern_literal(1);
        let zero = self.symbols.intern_literal(0);
        let (taken_value, fallthrough_value, mark) = if branch_means {
            (&one, &zero, format!("{}_true", result))
        } else {
            (&zero, &one, format!("{}_false", result))
        };
        let end = format!("{}_end", result);

        self.out.op_to(branch, &mark);
        self.out.op_to(Opcode::Lda, fallthrough_value);
        self.out.op_to(Opcode::Bra, &end);
        self.out.label(&mark);
        self.out.op_to(Opcode::Lda, taken_value);
        self.out.label(&end);
        self.out.op_to(Opcode::Sta, result);
    }

    /// The right operand is only evaluated when the left one is non-zero.
    fn compile_and(&mut self, left: &Expr, right: &Expr) -> Result<String, CompileError> {
        let result = self.symbols.fresh_temp(self.scope);
        let fail = format!("{}_false", result);
        let end = format!("{}_end", result);
        let one = self.symbols.intern_literal(1);
        let zero = self.symbols.intern_literal(0);

        let l = self.compile_expr(left)?;
        self.out.op_to(Opcode::Lda, &l);
        self.out.op_to(Opcode::Brz, &fail);
        let r = self.compile_expr(right)?;
        self.out.op_to(Opcode::Lda, &r);
        self.out.op_to(Opcode::Brz, &fail);
        self.out.op_to(Opcode::Lda, &one);
        self.out.op_to(Opcode::Bra, &end);
        self.out.label(&fail);
        self.out.op_to(Opcode::Lda, &zero);
        self.out.label(&end);
        self.out.op_to(Opcode::Sta, &result);
        Ok(result)
    }

    /// Any non-zero operand is true; the result is always 0 or 1.
    fn compile_or(&mut self, left: &Expr, right: &Expr) -> Result<String, CompileError> {
        let result = self.symbols.fresh_temp(self.scope);
        let check_right = format!("{}_right", result);
        let pass = format!("{}_true", result);
        let fail = format!("{}_false", result);
        let end = format!("{}_end", result);
        let one = self.symbols.intern_literal(1);
        let zero = self.symbols.intern_literal(0);

        let l = self.compile_expr(left)?;
        self.out.op_to(Opcode::Lda, &l);
        self.out.op_to(Opcode::Brz, &check_right);
        self.out.op_to(Opcode::Bra, &pass);
        self.out.label(&check_right);
        let r = self.compile_expr(right)?;
        self.out.op_to(Opcode::Lda, &r);
        self.out.op_to(Opcode::Brz, &fail);
        self.out.label(&pass);
        self.out.op_to(Opcode::Lda, &one);
        self.out.op_to(Opcode::Bra, &end);
        self.out.label(&fail);
        self.out.op_to(Opcode::Lda, &zero);
        self.out.label(&end);
        self.out.op_to(Opcode::Sta, &result);
        Ok(result)
    }

    // =========================================================================
    // Multiplicative lowering (no native multiply or divide)
    // =========================================================================

    /// `total = l * r` by repeated addition. A negative multiplier is
    /// flipped together with the addend, so the counter always runs down
    /// to zero.
    fn emit_multiply(&mut self, l: &str, r: &str, total: &str) {
        let zero = self.symbols.intern_literal(0);
        let one = self.symbols.intern_literal(1);
        let addend = self.symbols.fresh_temp(self.scope);
        let counter = self.symbols.fresh_temp(self.scope);
        let top = format!("{}_start", total);
        let done = format!("{}_end", total);

        self.out.copy(&zero, total);
        self.out.copy(l, &addend);
        self.out.copy(r, &counter);
        self.out.op_to(Opcode::Brp, &top);
        self.out.binary(&zero, Opcode::Sub, &counter, &counter);
        self.out.binary(&zero, Opcode::Sub, &addend, &addend);

        self.out.label(&top);
        self.out.op_to(Opcode::Lda, &counter);
        self.out.op_to(Opcode::Brz, &done);
        self.out.binary(total, Opcode::Add, &addend, total);
        self.out.binary(&counter, Opcode::Sub, &one, &counter);
        self.out.op_to(Opcode::Bra, &top);
        self.out.anchor(&done);
    }

    /// Floored division: `quotient = floor(l / r)` and
    /// `remainder = l - quotient * r`, which takes the divisor's sign.
    ///
    /// Both operands are reduced to magnitudes and divided by a subtract
    /// loop. That loop only notices the remainder went negative after one
    /// subtraction too many, so quotient and remainder are corrected by one
    /// step on exit. Signs are restored afterwards, rounding toward negative
    /// infinity when they differ. A zero divisor never leaves the loop.
    fn emit_floor_divmod(
        &mut self,
        l: &str,
        r: &str,
        quotient: &str,
        remainder: &str,
        base: &str,
    ) {
        let zero = self.symbols.intern_literal(0);
        let one = self.symbols.intern_literal(1);
        let dividend = self.symbols.fresh_temp(self.scope);
        let divisor = self.symbols.fresh_temp(self.scope);
        let l_negative = self.symbols.fresh_temp(self.scope);
        let r_negative = self.symbols.fresh_temp(self.scope);
        let l_ready = format!("{}_lpos", base);
        let r_ready = format!("{}_rpos", base);
        let top = format!("{}_start", base);
        let sign = format!("{}_sign", base);
        let done = format!("{}_end", base);

        self.out.copy(&zero, &l_negative);
        self.out.copy(&zero, &r_negative);
        self.out.copy(l, &dividend);
        self.out.op_to(Opcode::Brp, &l_ready);
        self.out.binary(&zero, Opcode::Sub, &dividend, &dividend);
        self.out.copy(&one, &l_negative);
        self.out.label(&l_ready);
        self.out.copy(r, &divisor);
        self.out.op_to(Opcode::Brp, &r_ready);
        self.out.binary(&zero, Opcode::Sub, &divisor, &divisor);
        self.out.copy(&one, &r_negative);

        self.out.label(&r_ready);
        self.out.copy(&zero, quotient);
        self.out.copy(&dividend, remainder);
        self.out.label(&top);
        self.out.binary(quotient, Opcode::Add, &one, quotient);
        self.out.binary(remainder, Opcode::Sub, &divisor, remainder);
        self.out.op_to(Opcode::Brp, &top);
        self.out.binary(quotient, Opcode::Sub, &one, quotient);
        self.out.binary(remainder, Opcode::Add, &divisor, remainder);

        // signs differ: negate, and round down if anything was left over
        self.out.op_to(Opcode::Lda, &l_negative);
        self.out.op_to(Opcode::Sub, &r_negative);
        self.out.op_to(Opcode::Brz, &sign);
        self.out.binary(&zero, Opcode::Sub, quotient, quotient);
        self.out.op_to(Opcode::Lda, remainder);
        self.out.op_to(Opcode::Brz, &sign);
        self.out.binary(quotient, Opcode::Sub, &one, quotient);
        self.out.binary(&divisor, Opcode::Sub, remainder, remainder);

        self.out.label(&sign);
        self.out.op_to(Opcode::Lda, &r_negative);
        self.out.op_to(Opcode::Brz, &done);
        self.out.binary(&zero, Opcode::Sub, remainder, remainder);
        self.out.anchor(&done);
    }

    fn emit_divide(&mut self, l: &str, r: &str, quotient: &str) {
        let remainder = self.symbols.fresh_temp(self.scope);
        self.emit_floor_divmod(l, r, quotient, &remainder, quotient);
    }

    fn emit_modulo(&mut self, l: &str, r: &str, remainder: &str) {
        let quotient = self.symbols.fresh_temp(self.scope);
        self.emit_floor_divmod(l, r, &quotient, remainder, remainder);
    }

    /// `total = l ^ r`: count the exponent down, multiplying `total` by
    /// `l` on each pass. The exponent is tested before each pass, so
    /// `x ^ 0` is 1; a negative exponent is treated as zero.
    fn emit_power(&mut self, l: &str, r: &str, total: &str) {
        let one = self.symbols.intern_literal(1);
        let exponent = self.symbols.fresh_temp(self.scope);
        let product = self.symbols.fresh_temp(self.scope);
        let outer = format!("{}_outer", total);
        let body = format!("{}_body", total);
        let outer_end = format!("{}_outer_end", total);

        self.out.copy(&one, total);
        self.out.copy(r, &exponent);
        self.out.label(&outer);
        self.out.op_to(Opcode::Lda, &exponent);
        self.out.op_to(Opcode::Brz, &outer_end);
        self.out.op_to(Opcode::Brp, &body);
        self.out.op_to(Opcode::Bra, &outer_end);

        self.out.label(&body);
        self.emit_multiply(total, l, &product);
        self.out.copy(&product, total);
        self.out.binary(&exponent, Opcode::Sub, &one, &exponent);
        self.out.op_to(Opcode::Bra, &outer);
        self.out.anchor(&outer_end);
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn compile_call(&mut self, name: &str, args: &[Expr]) -> Result<String, CompileError> {
        match name {
            "print" => self.compile_print(args),
            "input" => {
                if !args.is_empty() {
                    return Err(CompileError::arity("input", 0, args.len()));
                }
                let result = self.symbols.fresh_temp(self.scope);
                self.out.op(Opcode::Inp);
                self.out.op_to(Opcode::Sta, &result);
                Ok(result)
            }
            "assert" => {
                if args.len() != 1 {
                    return Err(CompileError::arity("assert", 1, args.len()));
                }
                self.compile_assert(&args[0])
            }
            _ => self.compile_user_call(name, args),
        }
    }

    /// Numbers go out with `OUT`, strings one `OUTC` per character. A
    /// newline follows when the last argument was text.
    fn compile_print(&mut self, args: &[Expr]) -> Result<String, CompileError> {
        self.out.comment("print");
        for arg in args {
            match arg {
                Expr::Str(text) => {
                    for c in text.chars() {
                        self.emit_char(c);
                    }
                }
                other => {
                    let value = self.compile_expr(other)?;
                    self.out.op_to(Opcode::Lda, &value);
                    self.out.op(Opcode::Out);
                }
            }
        }
        if args.last().is_none_or(|a| matches!(a, Expr::Str(_))) {
            self.emit_char('\n');
        }
        Ok(self.symbols.intern_literal(0))
    }

    fn emit_char(&mut self, c: char) {
        let code = self.symbols.intern_literal(i64::from(u32::from(c)));
        self.out.op_to(Opcode::Lda, &code);
        self.out.op(Opcode::OutC);
    }

    /// A false condition stops the machine on an `HLT` labelled
    /// `assert_N_fail`, which is how hosts tell it from a normal halt.
    fn compile_assert(&mut self, condition: &Expr) -> Result<String, CompileError> {
        let id = self.symbols.labels_mut().next_assert();
        let fail = format!("assert_{}_fail", id);
        let ok = format!("assert_{}_ok", id);
        self.out.comment(&format!("assert {}", id));

        let cond = self.compile_expr(condition)?;
        self.out.op_to(Opcode::Lda, &cond);
        self.out.op_to(Opcode::Brz, &fail);
        self.out.op_to(Opcode::Bra, &ok);
        self.out.label(&fail);
        self.out.op(Opcode::Hlt);
        self.out.anchor(&ok);
        Ok(self.symbols.intern_literal(1))
    }
}
