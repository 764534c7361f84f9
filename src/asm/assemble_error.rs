/// Errors raised while turning assembly text into a memory image.
///
/// Every variant carries the 1-based source line it was detected on.
/// Assembly aborts on the first error; no partial image is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembleError {
    /// More fields than `label OPCODE operand`, or no opcode at all.
    MalformedLine { line: usize, text: String },
    /// A field in opcode position that is not a known mnemonic.
    UnknownOpcode { line: usize, word: String },
    /// An address operation without an operand.
    MissingOperand { line: usize, opcode: String },
    /// An operand on an operation that takes none.
    UnexpectedOperand {
        line: usize,
        opcode: String,
        operand: String,
    },
    /// The same label defined twice.
    DuplicateLabel {
        line: usize,
        label: String,
        first_line: usize,
    },
    /// An operand that is neither a defined label nor a number.
    UndefinedSymbol { line: usize, symbol: String },
    /// A resolved operand outside `0..1000`.
    OperandOverflow { line: usize, operand: i64 },
    /// More instructions than the address space holds.
    ProgramTooLarge { words: usize },
}

impl AssembleError {
    pub fn line(&self) -> Option<usize> {
        match self {
            AssembleError::MalformedLine { line, .. }
            | AssembleError::UnknownOpcode { line, .. }
            | AssembleError::MissingOperand { line, .. }
            | AssembleError::UnexpectedOperand { line, .. }
            | AssembleError::DuplicateLabel { line, .. }
            | AssembleError::UndefinedSymbol { line, .. }
            | AssembleError::OperandOverflow { line, .. } => Some(*line),
            AssembleError::ProgramTooLarge { .. } => None,
        }
    }
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assemble error: ")?;
        match self {
            AssembleError::MalformedLine { line, text } => {
                write!(f, "line {}: malformed line '{}'", line, text)?;
                write!(f, "\n  hint: expected '[label] OPCODE [operand] [// comment]'")
            }
            AssembleError::UnknownOpcode { line, word } => {
                write!(f, "line {}: unknown opcode '{}'", line, word)
            }
            AssembleError::MissingOperand { line, opcode } => {
                write!(f, "line {}: {} requires an operand", line, opcode)
            }
            AssembleError::UnexpectedOperand {
                line,
                opcode,
                operand,
            } => write!(
                f,
                "line {}: {} takes no operand, got '{}'",
                line, opcode, operand
            ),
            AssembleError::DuplicateLabel {
                line,
                label,
                first_line,
            } => write!(
                f,
                "line {}: duplicate label '{}' (first defined on line {})",
                line, label, first_line
            ),
            AssembleError::UndefinedSymbol { line, symbol } => {
                write!(f, "line {}: undefined symbol '{}'", line, symbol)
            }
            AssembleError::OperandOverflow { line, operand } => write!(
                f,
                "line {}: operand {} does not fit in three digits",
                line, operand
            ),
            AssembleError::ProgramTooLarge { words } => write!(
                f,
                "program needs {} words but the address space holds 1000",
                words
            ),
        }
    }
}

impl std::error::Error for AssembleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_label_display() {
        let err = AssembleError::DuplicateLabel {
            line: 7,
            label: "loop_0_start".to_string(),
            first_line: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("duplicate label"));
        assert!(msg.contains("loop_0_start"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn test_malformed_line_has_hint() {
        let err = AssembleError::MalformedLine {
            line: 1,
            text: "a b c d".to_string(),
        };
        assert!(err.to_string().contains("hint"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_program_too_large_has_no_line() {
        let err = AssembleError::ProgramTooLarge { words: 1200 };
        assert_eq!(err.line(), None);
        assert!(err.to_string().contains("1200"));
    }
}
