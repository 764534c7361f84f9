/// A fault that stops the machine. Always distinct from a normal `HLT`.
///
/// `pc` is the address of the faulting instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    StackUnderflow { pc: usize },
    StackOverflow { pc: usize, limit: usize },
    UnknownOpcode { pc: usize, word: i64 },
    AddressOutOfBounds { pc: usize, address: i64, size: usize },
    ArithmeticOverflow { pc: usize },
    StepLimitExceeded { pc: usize, limit: usize },
    InvalidInput { pc: usize, text: String },
}

impl RuntimeError {
    pub fn pc(&self) -> usize {
        match self {
            RuntimeError::StackUnderflow { pc }
            | RuntimeError::StackOverflow { pc, .. }
            | RuntimeError::UnknownOpcode { pc, .. }
            | RuntimeError::AddressOutOfBounds { pc, .. }
            | RuntimeError::ArithmeticOverflow { pc }
            | RuntimeError::StepLimitExceeded { pc, .. }
            | RuntimeError::InvalidInput { pc, .. } => *pc,
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error at {:03}: ", self.pc())?;
        match self {
            RuntimeError::StackUnderflow { .. } => write!(f, "POP on an empty stack"),
            RuntimeError::StackOverflow { limit, .. } => {
                write!(f, "stack size limit exceeded ({})", limit)
            }
            RuntimeError::UnknownOpcode { word, .. } => {
                write!(f, "word {} is not an instruction", word)?;
                write!(f, "\n  hint: execution probably ran into a data cell")
            }
            RuntimeError::AddressOutOfBounds { address, size, .. } => write!(
                f,
                "address {} outside memory of {} words",
                address, size
            ),
            RuntimeError::ArithmeticOverflow { .. } => write!(f, "accumulator overflow"),
            RuntimeError::StepLimitExceeded { limit, .. } => {
                write!(f, "execution step limit exceeded ({})", limit)?;
                write!(f, "\n  hint: possible infinite loop")
            }
            RuntimeError::InvalidInput { text, .. } => {
                write!(f, "input '{}' is not an integer", text)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_pc() {
        let err = RuntimeError::StackUnderflow { pc: 7 };
        assert_eq!(err.pc(), 7);
        assert!(err.to_string().contains("007"));
        assert!(err.to_string().contains("empty stack"));
    }

    #[test]
    fn test_unknown_opcode_has_hint() {
        let err = RuntimeError::UnknownOpcode { pc: 3, word: -5 };
        let msg = err.to_string();
        assert!(msg.contains("-5"));
        assert!(msg.contains("hint"));
    }

    #[test]
    fn test_out_of_bounds_names_address_and_size() {
        let err = RuntimeError::AddressOutOfBounds {
            pc: 1,
            address: 1200,
            size: 40,
        };
        let msg = err.to_string();
        assert!(msg.contains("1200"));
        assert!(msg.contains("40 words"));
    }
}
