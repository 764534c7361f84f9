//! # Pipeline harness
//!
//! One call from pseudocode to a finished run:
//!
//! ```text
//! source ──parse──▶ Program ──compile──▶ assembly ──assemble──▶ image ──run──▶ Report
//! ```
//!
//! At the machine level a failed `assert` is an ordinary `HLT`. The harness
//! tells the two apart by the label the compiler puts on every assertion
//! failure (`assert_<n>_fail`).

use std::collections::BTreeMap;
use std::fmt;

use crate::{
    asm::{AssembleError, Assembled, assemble_program},
    codegen::{self, CompileError},
    frontend::{ParserError, parse_source},
    runtime::{RuntimeError, Snapshot, Status, Vm, VmConfig},
};

/// Any error from any phase of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Parse(ParserError),
    Compile(CompileError),
    Assemble(AssembleError),
    Runtime(RuntimeError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Parse(e) => write!(f, "{}", e),
            PipelineError::Compile(e) => write!(f, "{}", e),
            PipelineError::Assemble(e) => write!(f, "{}", e),
            PipelineError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ParserError> for PipelineError {
    fn from(e: ParserError) -> Self {
        PipelineError::Parse(e)
    }
}

impl From<CompileError> for PipelineError {
    fn from(e: CompileError) -> Self {
        PipelineError::Compile(e)
    }
}

impl From<AssembleError> for PipelineError {
    fn from(e: AssembleError) -> Self {
        PipelineError::Assemble(e)
    }
}

impl From<RuntimeError> for PipelineError {
    fn from(e: RuntimeError) -> Self {
        PipelineError::Runtime(e)
    }
}

/// How a run ended, short of a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Halted on the failure branch of an `assert`.
    AssertionFailed { address: usize },
    /// Stopped on an `INP` with no input left.
    AwaitingInput,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub outcome: Outcome,
    pub transcript: String,
    pub snapshot: Snapshot,
    pub labels: BTreeMap<String, usize>,
}

impl Report {
    /// Final value of the global variable `name`.
    pub fn variable(&self, name: &str) -> Option<i64> {
        let address = self.labels.get(&format!("global_var_{}", name))?;
        self.snapshot.memory.get(*address).copied()
    }

    pub fn assertion_failed(&self) -> bool {
        matches!(self.outcome, Outcome::AssertionFailed { .. })
    }
}

/// Pseudocode to assembly text.
pub fn compile(source: &str) -> Result<String, PipelineError> {
    let program = parse_source(source)?;
    Ok(codegen::compile(&program)?)
}

/// Pseudocode to a loadable image.
pub fn build(source: &str) -> Result<Assembled, PipelineError> {
    let text = compile(source)?;
    Ok(assemble_program(&text)?)
}

/// Build and run `source`, feeding `inputs` to `INP` in order.
pub fn run(source: &str, inputs: &[i64], config: VmConfig) -> Result<Report, PipelineError> {
    let image = build(source)?;
    run_image(&image, inputs, config)
}

/// Run an already assembled image.
pub fn run_image(
    image: &Assembled,
    inputs: &[i64],
    config: VmConfig,
) -> Result<Report, PipelineError> {
    let mut vm = Vm::with_config(config);
    vm.load(image.memory.clone());
    for &value in inputs {
        vm.push_input(value);
    }

    let status = vm.run()?;
    let outcome = match status {
        Status::AwaitingInput => Outcome::AwaitingInput,
        _ => classify_halt(image, vm.halted_at()),
    };

    if let Outcome::AssertionFailed { address } = outcome {
        log::debug!("assertion failed at {:03}", address);
    }

    Ok(Report {
        outcome,
        transcript: vm.transcript(),
        snapshot: vm.snapshot(),
        labels: image.labels.clone(),
    })
}

/// Decide whether a halt at `halted_at` was a failed assertion.
pub fn classify_halt(image: &Assembled, halted_at: Option<usize>) -> Outcome {
    let Some(address) = halted_at else {
        return Outcome::Completed;
    };
    let is_assert = image
        .labels
        .iter()
        .any(|(label, &at)| at == address && label.starts_with("assert_") && label.ends_with("_fail"));

    if is_assert {
        Outcome::AssertionFailed { address }
    } else {
        Outcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_src(source: &str) -> Report {
        run_with(source, &[])
    }

    fn run_with(source: &str, inputs: &[i64]) -> Report {
        let config = VmConfig {
            max_steps: Some(200_000),
            ..VmConfig::default()
        };
        match run(source, inputs, config) {
            Ok(report) => report,
            Err(e) => panic!("pipeline failed: {}", e),
        }
    }

    fn value_of(source: &str, name: &str) -> i64 {
        let report = run_src(source);
        assert_eq!(report.outcome, Outcome::Completed);
        report
            .variable(name)
            .unwrap_or_else(|| panic!("no variable '{}'", name))
    }

    #[test]
    fn test_literal_cells_are_unique() {
        let text = compile("a = 7 + 7\nb = a - 7\nc = 7 * 2\nd = 2 ^ 2").unwrap();
        let decls = |label: &str| {
            text.lines()
                .filter(|l| l.split_whitespace().next() == Some(label))
                .count()
        };
        assert_eq!(decls("literal_7"), 1);
        assert_eq!(decls("literal_2"), 1);
    }

    #[test]
    fn test_addition_round_trip() {
        assert_eq!(value_of("a = 2 + 3", "a"), 5);
    }

    #[test]
    fn test_subtraction_and_negation() {
        assert_eq!(value_of("a = 3 - 10", "a"), -7);
        assert_eq!(value_of("b = 4\na = -b", "a"), -4);
    }

    #[test]
    fn test_multiplication() {
        assert_eq!(value_of("a = 4 * 3", "a"), 12);
        assert_eq!(value_of("a = 0 * 5", "a"), 0);
        assert_eq!(value_of("a = 5 * 0", "a"), 0);
    }

    #[test]
    fn test_division_floors() {
        assert_eq!(value_of("a = 7 / 2", "a"), 3);
        assert_eq!(value_of("a = 10 / 2", "a"), 5);
        assert_eq!(value_of("a = 1 DIV 3", "a"), 0);
    }

    #[test]
    fn test_modulo() {
        assert_eq!(value_of("a = 7 MOD 3", "a"), 1);
        assert_eq!(value_of("a = 9 MOD 3", "a"), 0);
        assert_eq!(value_of("a = 2 MOD 5", "a"), 2);
    }

    #[test]
    fn test_power() {
        assert_eq!(value_of("a = 2 ^ 3", "a"), 8);
        assert_eq!(value_of("a = 5 ^ 0", "a"), 1);
        assert_eq!(value_of("a = 5 ^ 1", "a"), 5);
        assert_eq!(value_of("a = 2 ^ 3 ^ 2", "a"), 512);
    }

    #[test]
    fn test_multiplication_with_negative_operands() {
        assert_eq!(value_of("a = -4 * 3", "a"), -12);
        assert_eq!(value_of("a = 3 * -2", "a"), -6);
        assert_eq!(value_of("a = -3 * -2", "a"), 6);
        assert_eq!(value_of("b = 0 - 5\na = b * 0", "a"), 0);
    }

    #[test]
    fn test_division_with_negative_operands_floors() {
        assert_eq!(value_of("a = -7 / 2", "a"), -4);
        assert_eq!(value_of("a = 7 / -2", "a"), -4);
        assert_eq!(value_of("a = -7 / -2", "a"), 3);
        assert_eq!(value_of("a = -6 / 2", "a"), -3);
        assert_eq!(value_of("a = -1 DIV 3", "a"), -1);
    }

    #[test]
    fn test_modulo_takes_divisor_sign() {
        assert_eq!(value_of("a = -7 MOD 2", "a"), 1);
        assert_eq!(value_of("a = 7 MOD -2", "a"), -1);
        assert_eq!(value_of("a = -7 MOD -2", "a"), -1);
        assert_eq!(value_of("a = -6 MOD 3", "a"), 0);
    }

    #[test]
    fn test_power_with_negative_base() {
        assert_eq!(value_of("a = -2 ^ 2", "a"), 4);
        assert_eq!(value_of("b = 0 - 2\na = b ^ 3", "a"), -8);
        assert_eq!(value_of("a = -3 ^ 0", "a"), 1);
    }

    #[test]
    fn test_negative_exponent_counts_as_zero() {
        assert_eq!(value_of("a = 2 ^ -1", "a"), 1);
    }

    #[test]
    fn test_division_by_zero_runs_into_step_limit() {
        let config = VmConfig {
            max_steps: Some(5_000),
            ..VmConfig::default()
        };
        let err = run("a = 1 / 0", &[], config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Runtime(RuntimeError::StepLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_comparisons_are_canonical() {
        let pairs = [(5, 10), (15, 10), (10, 10)];
        let ops: [(&str, fn(i64, i64) -> bool); 6] = [
            ("<", |a, b| a < b),
            (">", |a, b| a > b),
            ("<=", |a, b| a <= b),
            (">=", |a, b| a >= b),
            ("==", |a, b| a == b),
            ("!=", |a, b| a != b),
        ];

        for (a, b) in pairs {
            for (symbol, expected) in ops {
                let source = format!("x = {}\ny = {}\nr = x {} y", a, b, symbol);
                assert_eq!(
                    value_of(&source, "r"),
                    i64::from(expected(a, b)),
                    "{} {} {}",
                    a,
                    symbol,
                    b
                );
            }
        }
    }

    #[test]
    fn test_logic_operators() {
        assert_eq!(value_of("a = true AND false", "a"), 0);
        assert_eq!(value_of("a = 3 AND 4", "a"), 1);
        assert_eq!(value_of("a = 0 OR 0", "a"), 0);
        assert_eq!(value_of("a = -1 OR 1", "a"), 1);
        assert_eq!(value_of("a = NOT 0", "a"), 1);
        assert_eq!(value_of("a = NOT 7", "a"), 0);
    }

    #[test]
    fn test_and_short_circuits() {
        // the right side would fail the assertion if evaluated
        let report = run_src("a = false AND assert(false)");
        assert_eq!(report.outcome, Outcome::Completed);
        let report = run_src("a = true OR assert(false)");
        assert_eq!(report.outcome, Outcome::Completed);
    }

    #[test]
    fn test_if_chain() {
        let source = "x = 2\nif x == 1 then\n  r = 10\nelseif x == 2 then\n  r = 20\nelse\n  r = 30\nendif";
        assert_eq!(value_of(source, "r"), 20);
        let source = "x = 9\nif x == 1 then\n  r = 10\nelse\n  r = 30\nendif";
        assert_eq!(value_of(source, "r"), 30);
        let source = "x = 9\nr = 5\nif x == 1 then\n  r = 10\nendif";
        assert_eq!(value_of(source, "r"), 5);
    }

    #[test]
    fn test_while_loop_sum() {
        let source = "i = 1\ns = 0\nwhile i <= 10\n  s = s + i\n  i = i + 1\nendwhile";
        assert_eq!(value_of(source, "s"), 55);
    }

    #[test]
    fn test_do_until_runs_body_first() {
        assert_eq!(value_of("n = 10\ndo\n  n = n + 1\nuntil true", "n"), 11);
        assert_eq!(value_of("n = 0\ndo\n  n = n + 2\nuntil n >= 6", "n"), 6);
    }

    #[test]
    fn test_for_loop_is_inclusive() {
        let source = "s = 0\nfor i = 1 to 4\n  s = s + i\nnext i";
        let report = run_src(source);
        assert_eq!(report.variable("s"), Some(10));
        assert_eq!(report.variable("i"), Some(4));
    }

    #[test]
    fn test_break_leaves_only_inner_loop() {
        let source = "\
outer = 0
inner = 0
i = 0
while i < 3
  j = 0
  while j < 10
    if j == 2 then
      break
    endif
    inner = inner + 1
    j = j + 1
  endwhile
  outer = outer + 1
  i = i + 1
endwhile";
        let report = run_src(source);
        assert_eq!(report.variable("outer"), Some(3));
        assert_eq!(report.variable("inner"), Some(6));
    }

    #[test]
    fn test_continue_rechecks_condition() {
        let source = "\
i = 0
odd = 0
while i < 6
  i = i + 1
  if i MOD 2 == 0 then
    continue
  endif
  odd = odd + 1
endwhile";
        assert_eq!(value_of(source, "odd"), 3);

        let source = "s = 0\nfor i = 1 to 5\n  if i == 3 then\n    continue\n  endif\n  s = s + i\nnext i";
        assert_eq!(value_of(source, "s"), 12);
    }

    #[test]
    fn test_for_variable_mismatch_is_rejected() {
        let err = compile("for i = 1 to 3\n  x = i\nnext k").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Compile(CompileError::ForVariableMismatch { .. })
        ));
    }

    #[test]
    fn test_assert_false_halts() {
        let report = run_src("a = 1\nassert(false)\na = 2");
        assert!(report.assertion_failed());
        assert_eq!(report.variable("a"), Some(1));
    }

    #[test]
    fn test_assert_true_continues() {
        let report = run_src("a = 1\nassert(a == 1)\na = 2");
        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.variable("a"), Some(2));
    }

    #[test]
    fn test_print_transcript() {
        let report = run_src("x = 6\nprint(\"x=\", x * 7)\nprint(\"done\")");
        assert_eq!(report.transcript, "x=42\ndone\n");
    }

    #[test]
    fn test_input_feeds_program() {
        let report = run_with("a = input()\nb = input()\nprint(a + b)", &[20, 22]);
        assert_eq!(report.transcript, "42\n");
    }

    #[test]
    fn test_missing_input_suspends() {
        let report = run_with("a = input()\nb = input()", &[1]);
        assert_eq!(report.outcome, Outcome::AwaitingInput);
        assert_eq!(report.variable("a"), Some(1));
    }

    #[test]
    fn test_function_call_and_return() {
        let source = "\
function add(a, b)
  return a + b
endfunction
x = add(2, 3)
y = add(x, 10)";
        let report = run_src(source);
        assert_eq!(report.variable("x"), Some(5));
        assert_eq!(report.variable("y"), Some(15));
        assert!(report.snapshot.stack.is_empty());
    }

    #[test]
    fn test_procedure_without_return_yields_zero() {
        let source = "\
procedure greet()
  print(\"hi\")
endprocedure
r = 9
r = greet()";
        let report = run_src(source);
        assert_eq!(report.transcript, "hi\n");
        assert_eq!(report.variable("r"), Some(0));
    }

    #[test]
    fn test_function_writes_globals() {
        let source = "\
count = 0
function bump()
  count = count + 1
endfunction
bump()
bump()";
        assert_eq!(value_of(source, "count"), 2);
    }

    #[test]
    fn test_early_return_inside_loop() {
        let source = "\
function first_over(limit)
  i = 0
  while true
    i = i + 1
    if i * i > limit then
      return i
    endif
  endwhile
endfunction
r = first_over(20)";
        assert_eq!(value_of(source, "r"), 5);
    }

    #[test]
    fn test_undefined_identifier_aborts() {
        assert!(matches!(
            run("a = missing", &[], VmConfig::default()),
            Err(PipelineError::Compile(CompileError::UndefinedIdentifier { .. }))
        ));
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(compile("if x then"), Err(PipelineError::Parse(_))));
    }

    #[test]
    fn test_step_limit_stops_runaway() {
        let config = VmConfig {
            max_steps: Some(500),
            ..VmConfig::default()
        };
        let err = run("while true\n  x = 1\nendwhile", &[], config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Runtime(RuntimeError::StepLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_snapshot_restore_after_run() {
        let image = build("a = 3\nb = a * a").unwrap();
        let mut vm = Vm::new();
        vm.load(image.memory.clone());
        vm.step().unwrap();
        vm.step().unwrap();
        let saved = vm.snapshot();

        vm.run().unwrap();
        vm.restore(&saved);
        assert_eq!(vm.snapshot(), saved);

        vm.run().unwrap();
        let b = image.address_of("global_var_b").unwrap();
        assert_eq!(vm.memory()[b], 9);
    }
}
