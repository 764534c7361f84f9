use super::op::Opcode;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Print a listing of a memory image to stdout.
pub fn print_listing(memory: &[i64], labels: &BTreeMap<String, usize>) {
    println!("=== MEMORY IMAGE ===\n");
    println!("{} words, {} labels", memory.len(), labels.len());
    println!("════════════════════════════════════════");
    print!("{}", disassemble(memory, labels));
}

/// Render one line per word: address, jump-target marker, decoded
/// instruction, and any label bound to the address or the operand.
///
/// Words that do not decode to an instruction are shown as `DAT`.
pub fn disassemble(memory: &[i64], labels: &BTreeMap<String, usize>) -> String {
    let names = names_by_address(labels);
    let targets = collect_jump_targets(memory);
    let mut out = String::new();

    for (address, &word) in memory.iter().enumerate() {
        if targets.contains(&address) {
            out.push_str("      ┌──────────────────────────────────\n");
        }

        let marker = if targets.contains(&address) { "► " } else { "  " };
        let label = names.get(&address).copied().unwrap_or("");
        let _ = write!(out, "{:03} {}{:<16} ", address, marker, label);

        let _ = match Opcode::decode(word) {
            Some((op, operand)) if op.takes_address() => {
                let target = operand as usize;
                match names.get(&target) {
                    Some(name) => writeln!(out, "{:<6} {:03}  ; {}", op, operand, name),
                    None => writeln!(out, "{:<6} {:03}", op, operand),
                }
            }
            // small positive words are almost always data, not `HLT n`
            Some((Opcode::Hlt, _)) if word != 0 => writeln!(out, "{:<6} {}", Opcode::Dat, word),
            Some((op, _)) => writeln!(out, "{}", op),
            None => writeln!(out, "{:<6} {}", Opcode::Dat, word),
        };
    }

    out
}

fn names_by_address(labels: &BTreeMap<String, usize>) -> BTreeMap<usize, &str> {
    let mut names = BTreeMap::new();
    for (name, &address) in labels {
        names.entry(address).or_insert(name.as_str());
    }
    names
}

fn collect_jump_targets(memory: &[i64]) -> BTreeSet<usize> {
    memory
        .iter()
        .filter_map(|&word| match Opcode::decode(word) {
            Some((op, operand)) if op.is_branch() => Some(operand as usize),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble_program;

    #[test]
    fn test_listing_shows_labels_and_operands() {
        let program = assemble_program("LDA x\nOUT\nHLT\nx DAT 42").unwrap();
        let text = disassemble(&program.memory, &program.labels);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("000"));
        assert!(lines[0].contains("LDA"));
        assert!(lines[0].contains("; x"));
        assert!(lines[1].contains("OUT"));
        assert!(lines[3].contains("x"));
        assert!(lines[3].contains("DAT"));
        assert!(lines[3].contains("42"));
    }

    #[test]
    fn test_jump_targets_are_marked() {
        let program = assemble_program("top NOP\nBRA top").unwrap();
        let text = disassemble(&program.memory, &program.labels);

        assert!(text.contains("┌"));
        assert!(text.contains("► top"));
    }

    #[test]
    fn test_negative_and_large_words_fall_back_to_dat() {
        let text = disassemble(&[-3, 12345], &BTreeMap::new());
        assert!(text.contains("DAT    -3"));
        assert!(text.contains("DAT    12345"));
    }
}
