use super::assemble_error::AssembleError;
use super::op::Opcode;

/// Most fields one instruction line may hold: `label OPCODE operand`.
const MAX_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum AsmToken {
    /// A bare identifier: a label definition or a label reference.
    Label(String),
    /// A recognised mnemonic.
    Opcode(Opcode),
    /// A signed decimal literal.
    Number(i64),
}

impl std::fmt::Display for AsmToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsmToken::Label(s) => write!(f, "{}", s),
            AsmToken::Opcode(op) => write!(f, "{}", op),
            AsmToken::Number(n) => write!(f, "{}", n),
        }
    }
}

/// The tokens of one non-blank source line.
#[derive(Debug, Clone, PartialEq)]
pub struct LexedLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub tokens: Vec<AsmToken>,
}

/// Splits assembly text into classified tokens, one group per line.
///
/// `//` comments are stripped first; blank and comment-only lines are
/// dropped. A line with more than three fields is rejected.
pub fn lex(source: &str) -> Result<Vec<LexedLine>, AssembleError> {
    let mut lines = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let code = match raw.find("//") {
            Some(pos) => &raw[..pos],
            None => raw,
        };

        let fields: Vec<&str> = code.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() > MAX_FIELDS {
            return Err(AssembleError::MalformedLine {
                line,
                text: code.trim().to_string(),
            });
        }

        let tokens = fields.into_iter().map(classify).collect();
        lines.push(LexedLine { line, tokens });
    }

    Ok(lines)
}

fn classify(field: &str) -> AsmToken {
    if let Some(op) = Opcode::from_mnemonic(field) {
        return AsmToken::Opcode(op);
    }
    match field.parse::<i64>() {
        Ok(n) => AsmToken::Number(n),
        Err(_) => AsmToken::Label(field.to_string()),
    }
}
