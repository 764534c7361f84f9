use crate::asm::Opcode;

const LABEL_WIDTH: usize = 20;

/// Collects assembly lines as the compiler walks the tree.
///
/// A label set with [`Emitter::label`] attaches to the next instruction.
/// Two labels in a row would give one instruction two names, so the first
/// one is flushed onto a `NOP`.
#[derive(Debug, Clone)]
pub struct Emitter {
    lines: Vec<String>,
    pending_label: Option<String>,
    comments: bool,
    instructions: usize,
}

impl Emitter {
    pub fn new(comments: bool) -> Self {
        Emitter {
            lines: Vec::new(),
            pending_label: None,
            comments,
            instructions: 0,
        }
    }

    /// Instructions emitted so far (comments excluded).
    pub fn len(&self) -> usize {
        self.instructions
    }

    pub fn is_empty(&self) -> bool {
        self.instructions == 0
    }

    pub fn label(&mut self, label: &str) {
        if let Some(previous) = self.pending_label.take() {
            self.push(Some(previous), Opcode::Nop, None);
        }
        self.pending_label = Some(label.to_string());
    }

    /// `label NOP`: a branch target with no effect.
    pub fn anchor(&mut self, label: &str) {
        self.label(label);
        self.op(Opcode::Nop);
    }

    pub fn op(&mut self, op: Opcode) {
        let label = self.pending_label.take();
        self.push(label, op, None);
    }

    pub fn op_to(&mut self, op: Opcode, operand: &str) {
        let label = self.pending_label.take();
        self.push(label, op, Some(operand));
    }

    /// `LDA a`, `op b`, `STA dest`.
    pub fn binary(&mut self, a: &str, op: Opcode, b: &str, dest: &str) {
        self.op_to(Opcode::Lda, a);
        self.op_to(op, b);
        self.op_to(Opcode::Sta, dest);
    }

    /// `LDA from`, `STA to`.
    pub fn copy(&mut self, from: &str, to: &str) {
        self.op_to(Opcode::Lda, from);
        self.op_to(Opcode::Sta, to);
    }

    pub fn comment(&mut self, text: &str) {
        if self.comments {
            self.lines.push(format!("// {}", text));
        }
    }

    /// Raw, already formatted lines such as data declarations.
    pub fn raw(&mut self, line: String) {
        self.lines.push(line);
        self.instructions += 1;
    }

    fn push(&mut self, label: Option<String>, op: Opcode, operand: Option<&str>) {
        let label = label.unwrap_or_default();
        let line = match operand {
            Some(operand) => format!("{:<width$} {} {}", label, op, operand, width = LABEL_WIDTH),
            None => format!("{:<width$} {}", label, op, width = LABEL_WIDTH),
        };
        self.lines.push(line);
        self.instructions += 1;
    }

    pub fn finish(mut self) -> String {
        if let Some(label) = self.pending_label.take() {
            self.push(Some(label), Opcode::Nop, None);
        }
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }

    #[test]
    fn test_label_attaches_to_next_instruction() {
        let mut out = Emitter::new(false);
        out.label("here");
        out.op_to(Opcode::Lda, "x");
        out.op(Opcode::Hlt);
        let text = out.finish();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(fields(lines[0]), vec!["here", "LDA", "x"]);
        assert_eq!(fields(lines[1]), vec!["HLT"]);
    }

    #[test]
    fn test_double_label_flushes_nop() {
        let mut out = Emitter::new(false);
        out.label("a");
        out.label("b");
        out.op(Opcode::Out);
        let text = out.finish();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(fields(lines[0]), vec!["a", "NOP"]);
        assert_eq!(fields(lines[1]), vec!["b", "OUT"]);
    }

    #[test]
    fn test_trailing_label_is_flushed() {
        let mut out = Emitter::new(false);
        out.label("end");
        assert_eq!(fields(out.finish().trim()), vec!["end", "NOP"]);
    }

    #[test]
    fn test_comments_are_optional() {
        let mut on = Emitter::new(true);
        on.comment("hello");
        on.op(Opcode::Hlt);
        assert_eq!(on.len(), 1);
        assert!(on.finish().starts_with("// hello"));

        let mut off = Emitter::new(false);
        off.comment("hello");
        off.op(Opcode::Hlt);
        assert!(!off.finish().contains("hello"));
    }
}
