use crate::asm::{AssembleError, Assembled, MEMORY_LIMIT, Opcode, assemble_program};
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::snapshot::{Snapshot, Status};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Steps allowed before the run is aborted. `None` runs unbounded.
    pub max_steps: Option<usize>,
    pub max_stack_size: usize,
    /// Pad loaded images with zero words up to this size (capped at 1000).
    pub memory_size: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_steps: None,
            max_stack_size: 1000,
            memory_size: None,
        }
    }
}

/// One value emitted by `OUT` or `OUTC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Number(i64),
    Char(char),
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Number(n) => writeln!(f, "{}", n),
            Output::Char(c) => write!(f, "{}", c),
        }
    }
}

/// Supplies raw text for `INP` once the queued values run out.
/// Returning `None` suspends the machine.
pub type InputProvider = Box<dyn FnMut() -> Option<String>>;

/// Called for every value the program outputs.
pub type PrintHook = Box<dyn FnMut(&Output)>;

/// Single-accumulator machine over a flat memory of packed words.
pub struct Vm {
    memory: Vec<i64>,
    stack: Vec<i64>,
    accumulator: i64,
    pc: usize,
    status: Status,

    config: VmConfig,
    steps: usize,

    input_queue: VecDeque<i64>,
    input_provider: Option<InputProvider>,
    print_hook: Option<PrintHook>,
    output: Vec<Output>,
    halted_at: Option<usize>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            memory: Vec::new(),
            stack: Vec::new(),
            accumulator: 0,
            pc: 0,
            status: Status::Running,
            config,
            steps: 0,
            input_queue: VecDeque::new(),
            input_provider: None,
            print_hook: None,
            output: Vec::new(),
            halted_at: None,
        }
    }

    pub fn set_input_provider(&mut self, provider: InputProvider) {
        self.input_provider = Some(provider);
    }

    pub fn set_print_hook(&mut self, hook: PrintHook) {
        self.print_hook = Some(hook);
    }

    /// Queue a value for a later `INP`. Clears an input suspension.
    pub fn push_input(&mut self, value: i64) {
        self.input_queue.push_back(value);
        if self.status == Status::AwaitingInput {
            self.status = Status::Running;
        }
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Replace memory with `image` and reset the registers.
    pub fn load(&mut self, mut image: Vec<i64>) {
        if let Some(size) = self.config.memory_size {
            let size = size.min(MEMORY_LIMIT);
            if image.len() < size {
                image.resize(size, 0);
            }
        }
        self.memory = image;
        self.reset_state();
    }

    /// Assemble `source` and load the result. The image is returned for
    /// its label table.
    pub fn assemble_into_memory(&mut self, source: &str) -> Result<Assembled, AssembleError> {
        let program = assemble_program(source)?;
        self.load(program.memory.clone());
        Ok(program)
    }

    /// Reset registers, stack, and transcript. Memory and queued input stay.
    pub fn reset_state(&mut self) {
        self.stack.clear();
        self.accumulator = 0;
        self.pc = 0;
        self.status = Status::Running;
        self.steps = 0;
        self.output.clear();
        self.halted_at = None;
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    pub fn memory(&self) -> &[i64] {
        &self.memory
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn accumulator(&self) -> i64 {
        self.accumulator
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn output(&self) -> &[Output] {
        &self.output
    }

    /// Address of the `HLT` that stopped the machine.
    pub fn halted_at(&self) -> Option<usize> {
        self.halted_at
    }

    pub fn transcript(&self) -> String {
        self.output.iter().map(|o| o.to_string()).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            memory: self.memory.clone(),
            accumulator: self.accumulator,
            pc: self.pc,
            stack: self.stack.clone(),
            status: self.status,
        }
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.memory = snapshot.memory.clone();
        self.accumulator = snapshot.accumulator;
        self.pc = snapshot.pc;
        self.stack = snapshot.stack.clone();
        self.status = snapshot.status;
        self.halted_at = match snapshot.status {
            Status::Halted => Some(snapshot.pc),
            _ => None,
        };
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    /// Step until the machine halts or waits for input.
    pub fn run(&mut self) -> Result<Status, RuntimeError> {
        loop {
            match self.step()? {
                Status::Running => continue,
                other => return Ok(other),
            }
        }
    }

    /// Execute one fetch-decode-execute cycle.
    ///
    /// A halted machine stays halted. An `INP` without input leaves the
    /// program counter on the `INP` and reports `AwaitingInput`.
    pub fn step(&mut self) -> Result<Status, RuntimeError> {
        if self.status == Status::Halted {
            return Ok(Status::Halted);
        }

        let pc = self.pc;
        if let Some(limit) = self.config.max_steps {
            if self.steps >= limit {
                return Err(RuntimeError::StepLimitExceeded { pc, limit });
            }
        }

        let word = self.read(pc, pc as i64)?;
        let (op, operand) =
            Opcode::decode(word).ok_or(RuntimeError::UnknownOpcode { pc, word })?;
        let mut next = pc + 1;

        log::trace!(
            "{:03}: {:<5} {:03}  acc={} stack={:?}",
            pc,
            op,
            operand,
            self.accumulator,
            self.stack
        );

        match op {
            Opcode::Add => {
                let value = self.read(pc, operand)?;
                self.accumulator = self
                    .accumulator
                    .checked_add(value)
                    .ok_or(RuntimeError::ArithmeticOverflow { pc })?;
            }
            Opcode::Sub => {
                let value = self.read(pc, operand)?;
                self.accumulator = self
                    .accumulator
                    .checked_sub(value)
                    .ok_or(RuntimeError::ArithmeticOverflow { pc })?;
            }
            Opcode::Sta => {
                let address = self.address(pc, operand)?;
                self.memory[address] = self.accumulator;
            }
            Opcode::Lda => self.accumulator = self.read(pc, operand)?,

            Opcode::Bra => next = self.address(pc, operand)?,
            Opcode::Brz => {
                if self.accumulator == 0 {
                    next = self.address(pc, operand)?;
                }
            }
            Opcode::Brp => {
                if self.accumulator >= 0 {
                    next = self.address(pc, operand)?;
                }
            }

            Opcode::Hlt => {
                self.status = Status::Halted;
                self.halted_at = Some(pc);
            }
            Opcode::Nop => {}

            Opcode::Pop => {
                self.accumulator = self.stack.pop().ok_or(RuntimeError::StackUnderflow { pc })?;
            }
            Opcode::Psh => {
                if self.stack.len() >= self.config.max_stack_size {
                    return Err(RuntimeError::StackOverflow {
                        pc,
                        limit: self.config.max_stack_size,
                    });
                }
                self.stack.push(self.accumulator);
            }
            Opcode::LdaPc => self.accumulator = next as i64,
            Opcode::LdaAcc => self.accumulator = self.read(pc, self.accumulator)?,
            Opcode::Ret => next = self.address(pc, self.accumulator)?,

            Opcode::Inp => match self.next_input(pc)? {
                Some(value) => self.accumulator = value,
                None => {
                    self.status = Status::AwaitingInput;
                    return Ok(Status::AwaitingInput);
                }
            },
            Opcode::Out => self.emit(Output::Number(self.accumulator)),
            Opcode::OutC => {
                let c = u32::try_from(self.accumulator)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                self.emit(Output::Char(c));
            }

            // never produced by decode
            Opcode::Dat => return Err(RuntimeError::UnknownOpcode { pc, word }),
        }

        self.steps += 1;
        if self.status != Status::Halted {
            self.pc = next;
            self.status = Status::Running;
        }
        Ok(self.status)
    }

    fn address(&self, pc: usize, address: i64) -> Result<usize, RuntimeError> {
        usize::try_from(address)
            .ok()
            .filter(|&a| a < self.memory.len())
            .ok_or(RuntimeError::AddressOutOfBounds {
                pc,
                address,
                size: self.memory.len(),
            })
    }

    fn read(&self, pc: usize, address: i64) -> Result<i64, RuntimeError> {
        Ok(self.memory[self.address(pc, address)?])
    }

    fn next_input(&mut self, pc: usize) -> Result<Option<i64>, RuntimeError> {
        if let Some(value) = self.input_queue.pop_front() {
            return Ok(Some(value));
        }
        let Some(provider) = self.input_provider.as_mut() else {
            return Ok(None);
        };
        match provider() {
            Some(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| RuntimeError::InvalidInput { pc, text }),
            None => Ok(None),
        }
    }

    fn emit(&mut self, out: Output) {
        if let Some(hook) = self.print_hook.as_mut() {
            hook(&out);
        }
        self.output.push(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn vm_for(source: &str) -> Vm {
        let mut vm = Vm::new();
        vm.assemble_into_memory(source).expect("assembly should succeed");
        vm
    }

    fn run_source(source: &str) -> Result<Vm, RuntimeError> {
        let mut vm = vm_for(source);
        vm.run()?;
        Ok(vm)
    }

    fn assert_output(source: &str, expected: &str) {
        let vm = run_source(source).expect("execution should succeed");
        assert_eq!(vm.transcript(), expected, "transcript mismatch");
    }

    fn assert_error(source: &str, error_contains: &str) {
        match run_source(source) {
            Ok(vm) => panic!(
                "expected error containing '{}', got transcript: {:?}",
                error_contains,
                vm.transcript()
            ),
            Err(e) => assert!(
                e.to_string().contains(error_contains),
                "expected error containing '{}', got: {}",
                error_contains,
                e
            ),
        }
    }

    // ============================================================
    // Arithmetic and memory
    // ============================================================

    #[test]
    fn test_add_and_out() {
        assert_output("LDA a\nADD b\nOUT\nHLT\na DAT 2\nb DAT 3", "5\n");
    }

    #[test]
    fn test_sub_can_go_negative() {
        assert_output("LDA a\nSUB b\nOUT\nHLT\na DAT 2\nb DAT 3", "-1\n");
    }

    #[test]
    fn test_sta_writes_memory() {
        let vm = run_source("LDA a\nSTA b\nHLT\na DAT 9\nb DAT").unwrap();
        assert_eq!(vm.memory()[4], 9);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let source = format!("LDA a\nADD a\nHLT\na DAT {}", i64::MAX);
        assert_error(&source, "overflow");
    }

    // ============================================================
    // Branching
    // ============================================================

    #[test]
    fn test_brp_branches_on_zero() {
        assert_output(
            "LDA zero\nBRP yes\nLDA one\nOUT\nHLT\nyes LDA zero\nOUT\nHLT\nzero DAT 0\none DAT 1",
            "0\n",
        );
    }

    #[test]
    fn test_brp_falls_through_on_negative() {
        assert_output(
            "LDA neg\nBRP yes\nOUT\nHLT\nyes HLT\nneg DAT -1",
            "-1\n",
        );
    }

    #[test]
    fn test_brz_only_on_zero() {
        assert_output(
            "LDA one\nBRZ skip\nOUT\nskip HLT\none DAT 1",
            "1\n",
        );
    }

    #[test]
    fn test_countdown_loop() {
        assert_output(
            "top LDA n\nOUT\nSUB one\nSTA n\nBRZ done\nBRA top\ndone HLT\nn DAT 3\none DAT 1",
            "3\n2\n1\n",
        );
    }

    // ============================================================
    // Stack, indirection, return
    // ============================================================

    #[test]
    fn test_push_pop() {
        let vm = run_source("LDA a\nPSH\nLDA b\nPOP\nHLT\na DAT 4\nb DAT 8").unwrap();
        assert_eq!(vm.accumulator(), 4);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_pop_underflow() {
        assert_error("POP\nHLT", "empty stack");
    }

    #[test]
    fn test_stack_limit() {
        let mut vm = Vm::with_config(VmConfig {
            max_stack_size: 2,
            ..VmConfig::default()
        });
        vm.assemble_into_memory("top PSH\nBRA top").unwrap();
        let err = vm.run().unwrap_err();
        assert!(matches!(err, RuntimeError::StackOverflow { limit: 2, .. }));
    }

    #[test]
    fn test_ldapc_loads_next_address() {
        let vm = run_source("NOP\nLDAPC\nHLT").unwrap();
        assert_eq!(vm.accumulator(), 2);
    }

    #[test]
    fn test_ldacc_loads_through_accumulator() {
        let vm = run_source("LDA ptr\nLDACC\nHLT\nptr DAT 4\nval DAT 77").unwrap();
        assert_eq!(vm.accumulator(), 77);
    }

    #[test]
    fn test_ret_branches_to_accumulator() {
        assert_output("LDA dest\nRET\nHLT\nOUT\nHLT\ndest DAT 3", "3\n");
    }

    #[test]
    fn test_out_of_bounds_access() {
        assert_error("LDA 500\nHLT", "outside memory");
        assert_error("LDA neg\nRET\nneg DAT -4", "address -4");
    }

    #[test]
    fn test_running_off_the_end() {
        assert_error("NOP", "address 1");
    }

    #[test]
    fn test_unknown_opcode() {
        assert_error("BRA bad\nbad DAT 4009", "not an instruction");
    }

    #[test]
    fn test_step_limit() {
        let mut vm = Vm::with_config(VmConfig {
            max_steps: Some(10),
            ..VmConfig::default()
        });
        vm.assemble_into_memory("top BRA top").unwrap();
        let err = vm.run().unwrap_err();
        assert!(matches!(err, RuntimeError::StepLimitExceeded { limit: 10, .. }));
    }

    // ============================================================
    // I/O
    // ============================================================

    #[test]
    fn test_outc_emits_characters() {
        assert_output("LDA h\nOUTC\nLDA i\nOUTC\nHLT\nh DAT 104\ni DAT 105", "hi");
    }

    #[test]
    fn test_input_queue_is_fifo() {
        let mut vm = vm_for("INP\nOUT\nINP\nOUT\nHLT");
        vm.push_input(10);
        vm.push_input(2);
        vm.run().unwrap();
        assert_eq!(vm.transcript(), "10\n2\n");
    }

    #[test]
    fn test_input_suspends_and_resumes() {
        let mut vm = vm_for("INP\nOUT\nHLT");
        assert_eq!(vm.run().unwrap(), Status::AwaitingInput);
        assert_eq!(vm.pc(), 0);
        assert_eq!(vm.step().unwrap(), Status::AwaitingInput);

        vm.push_input(6);
        assert_eq!(vm.status(), Status::Running);
        assert_eq!(vm.run().unwrap(), Status::Halted);
        assert_eq!(vm.transcript(), "6\n");
    }

    #[test]
    fn test_input_provider_after_queue() {
        let mut vm = vm_for("INP\nOUT\nINP\nOUT\nHLT");
        vm.push_input(1);
        let mut answers = vec!["  42 ".to_string()].into_iter();
        vm.set_input_provider(Box::new(move || answers.next()));
        vm.run().unwrap();
        assert_eq!(vm.transcript(), "1\n42\n");
    }

    #[test]
    fn test_input_provider_rejects_text() {
        let mut vm = vm_for("INP\nHLT");
        vm.set_input_provider(Box::new(|| Some("seven".to_string())));
        let err = vm.run().unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidInput { pc: 0, .. }));
    }

    #[test]
    fn test_print_hook_sees_every_output() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut vm = vm_for("LDA a\nOUT\nOUTC\nHLT\na DAT 65");
        vm.set_print_hook(Box::new(move |o| sink.borrow_mut().push(*o)));
        vm.run().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![Output::Number(65), Output::Char('A')]
        );
    }

    // ============================================================
    // State management
    // ============================================================

    #[test]
    fn test_halt_is_sticky() {
        let mut vm = vm_for("HLT\nOUT");
        assert_eq!(vm.step().unwrap(), Status::Halted);
        assert_eq!(vm.step().unwrap(), Status::Halted);
        assert_eq!(vm.halted_at(), Some(0));
        assert_eq!(vm.steps(), 1);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut vm = vm_for("LDA a\nPSH\nADD a\nSTA a\nHLT\na DAT 5");
        vm.step().unwrap();
        vm.step().unwrap();
        let snap = vm.snapshot();

        vm.run().unwrap();
        assert_eq!(vm.memory()[5], 10);

        vm.restore(&snap);
        assert_eq!(vm.snapshot(), snap);
        assert_eq!(vm.memory()[5], 5);
        assert_eq!(vm.accumulator(), 5);
        assert_eq!(vm.pc(), 2);
        assert_eq!(vm.stack(), &[5]);

        vm.run().unwrap();
        assert_eq!(vm.memory()[5], 10);
    }

    #[test]
    fn test_reset_state_keeps_memory() {
        let mut vm = vm_for("LDA a\nADD a\nSTA a\nHLT\na DAT 1");
        vm.run().unwrap();
        vm.reset_state();
        assert_eq!(vm.pc(), 0);
        assert_eq!(vm.status(), Status::Running);
        vm.run().unwrap();
        assert_eq!(vm.memory()[4], 4);
    }

    #[test]
    fn test_memory_size_pads_image() {
        let mut vm = Vm::with_config(VmConfig {
            memory_size: Some(100),
            ..VmConfig::default()
        });
        vm.assemble_into_memory("LDA 99\nSTA 50\nHLT").unwrap();
        assert_eq!(vm.memory().len(), 100);
        vm.run().unwrap();
        assert_eq!(vm.memory()[50], 0);
    }
}
