use super::assemble_error::AssembleError;
use super::lexer::{AsmToken, LexedLine, lex};
use super::op::{OPERAND_LIMIT, Opcode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Addressable words of the machine.
pub const MEMORY_LIMIT: usize = OPERAND_LIMIT as usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Value(i64),
    Label(String),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Value(n) => write!(f, "{}", n),
            Operand::Label(s) => write!(f, "{}", s),
        }
    }
}

/// One parsed assembly line. Its index in the program is its address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub label: Option<String>,
    pub opcode: Opcode,
    pub operand: Operand,
    /// 1-based source line, kept for diagnostics.
    pub line: usize,
}

/// A fully assembled program: the memory image plus the label table that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembled {
    pub memory: Vec<i64>,
    pub labels: BTreeMap<String, usize>,
    pub instructions: Vec<Instruction>,
}

impl Assembled {
    pub fn address_of(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// Reverse lookup of the label bound to `address`.
    pub fn label_at(&self, address: usize) -> Option<&str> {
        self.instructions
            .get(address)
            .and_then(|i| i.label.as_deref())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Assembles text straight into a flat memory image.
pub fn assemble(source: &str) -> Result<Vec<i64>, AssembleError> {
    Ok(assemble_program(source)?.memory)
}

/// Runs all three phases: lexical analysis, syntax analysis, packing.
pub fn assemble_program(source: &str) -> Result<Assembled, AssembleError> {
    let lines = lex(source)?;
    let (instructions, labels) = syntax_analysis(&lines)?;
    let memory = pack(&instructions, &labels)?;

    log::debug!(
        "assembled {} words ({} labels)",
        memory.len(),
        labels.len()
    );

    Ok(Assembled {
        memory,
        labels,
        instructions,
    })
}

// =============================================================================
// Syntax analysis
// =============================================================================

/// Groups each line's tokens into an [`Instruction`] and builds the
/// label → address table.
pub fn syntax_analysis(
    lines: &[LexedLine],
) -> Result<(Vec<Instruction>, BTreeMap<String, usize>), AssembleError> {
    let mut instructions: Vec<Instruction> = Vec::with_capacity(lines.len());
    let mut labels: BTreeMap<String, usize> = BTreeMap::new();

    for lexed in lines {
        let instruction = parse_line(lexed)?;

        if let Some(label) = &instruction.label {
            if let Some(&first) = labels.get(label) {
                return Err(AssembleError::DuplicateLabel {
                    line: lexed.line,
                    label: label.clone(),
                    first_line: instructions[first].line,
                });
            }
            labels.insert(label.clone(), instructions.len());
        }

        instructions.push(instruction);
    }

    if instructions.len() > MEMORY_LIMIT {
        return Err(AssembleError::ProgramTooLarge {
            words: instructions.len(),
        });
    }

    Ok((instructions, labels))
}

fn parse_line(lexed: &LexedLine) -> Result<Instruction, AssembleError> {
    let line = lexed.line;
    let malformed = || AssembleError::MalformedLine {
        line,
        text: lexed
            .tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" "),
    };

    // Optional leading label, then a mandatory opcode.
    let (label, rest) = match lexed.tokens.as_slice() {
        [AsmToken::Label(name), rest @ ..] => (Some(name.clone()), rest),
        rest => (None, rest),
    };

    let (opcode, operand_token) = match rest {
        [AsmToken::Opcode(op)] => (*op, None),
        [AsmToken::Opcode(op), operand] => (*op, Some(operand)),
        [AsmToken::Label(word), ..] if label.is_some() => {
            return Err(AssembleError::UnknownOpcode {
                line,
                word: word.clone(),
            });
        }
        _ => return Err(malformed()),
    };

    let operand = match operand_token {
        None => Operand::None,
        Some(AsmToken::Number(n)) => Operand::Value(*n),
        Some(AsmToken::Label(name)) => Operand::Label(name.clone()),
        Some(AsmToken::Opcode(_)) => return Err(malformed()),
    };

    match (&operand, opcode) {
        (Operand::None, op) if op.takes_address() => {
            return Err(AssembleError::MissingOperand {
                line,
                opcode: op.to_string(),
            });
        }
        (Operand::None, _) | (_, Opcode::Dat) => {}
        (other, op) if !op.takes_address() => {
            return Err(AssembleError::UnexpectedOperand {
                line,
                opcode: op.to_string(),
                operand: other.to_string(),
            });
        }
        _ => {}
    }

    Ok(Instruction {
        label,
        opcode,
        operand,
        line,
    })
}

// =============================================================================
// Packing
// =============================================================================

/// Resolves label operands and packs every instruction into one word.
pub fn pack(
    instructions: &[Instruction],
    labels: &BTreeMap<String, usize>,
) -> Result<Vec<i64>, AssembleError> {
    let mut memory = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        let value = match &instruction.operand {
            Operand::None => 0,
            Operand::Value(n) => *n,
            Operand::Label(name) => match labels.get(name) {
                Some(&address) => address as i64,
                None => {
                    return Err(AssembleError::UndefinedSymbol {
                        line: instruction.line,
                        symbol: name.clone(),
                    });
                }
            },
        };

        if instruction.opcode != Opcode::Dat && !(0..OPERAND_LIMIT).contains(&value) {
            return Err(AssembleError::OperandOverflow {
                line: instruction.line,
                operand: value,
            });
        }

        memory.push(instruction.opcode.encode(value));
    }

    Ok(memory)
}
