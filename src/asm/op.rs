use serde::{Deserialize, Serialize};

// =============================================================================
// OPCODE - Accumulator machine instructions
// =============================================================================

/// Every packed word is `digit * 1000 + operand`, so operands live in `0..1000`.
pub const OPERAND_LIMIT: i64 = 1000;

/// Largest word that still decodes to an instruction.
pub const WORD_LIMIT: i64 = 10 * OPERAND_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // classic single-address operations
    Hlt,
    Add,
    Sub,
    Sta,
    Lda,
    Bra,
    Brz,
    Brp,

    // ==========================================================================
    // Extended group 4: the operand selects the operation
    // ==========================================================================
    Nop,
    Pop,
    Psh,
    /// Load the address of the following instruction.
    LdaPc,
    /// Load through the accumulator: `acc = memory[acc]`.
    LdaAcc,
    /// Indirect branch: `pc = acc`.
    Ret,

    // ==========================================================================
    // Extended group 9: I/O
    // ==========================================================================
    Inp,
    Out,
    OutC,

    /// Pseudo-op: the operand is stored verbatim as a data word.
    Dat,
}

impl Opcode {
    pub const ALL: [Opcode; 18] = [
        Opcode::Hlt,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Sta,
        Opcode::Lda,
        Opcode::Bra,
        Opcode::Brz,
        Opcode::Brp,
        Opcode::Nop,
        Opcode::Pop,
        Opcode::Psh,
        Opcode::LdaPc,
        Opcode::LdaAcc,
        Opcode::Ret,
        Opcode::Inp,
        Opcode::Out,
        Opcode::OutC,
        Opcode::Dat,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Sta => "STA",
            Opcode::Lda => "LDA",
            Opcode::Bra => "BRA",
            Opcode::Brz => "BRZ",
            Opcode::Brp => "BRP",
            Opcode::Nop => "NOP",
            Opcode::Pop => "POP",
            Opcode::Psh => "PSH",
            Opcode::LdaPc => "LDAPC",
            Opcode::LdaAcc => "LDACC",
            Opcode::Ret => "RET",
            Opcode::Inp => "INP",
            Opcode::Out => "OUT",
            Opcode::OutC => "OUTC",
            Opcode::Dat => "DAT",
        }
    }

    /// Case-insensitive keyword lookup.
    pub fn from_mnemonic(word: &str) -> Option<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(word))
    }

    /// Operations whose operand is a memory address (or branch target).
    pub fn takes_address(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Sta
                | Opcode::Lda
                | Opcode::Bra
                | Opcode::Brz
                | Opcode::Brp
        )
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Bra | Opcode::Brz | Opcode::Brp)
    }

    /// Opcode digit plus the fixed operand for operations that have one.
    fn encoding(self) -> Option<(i64, Option<i64>)> {
        Some(match self {
            Opcode::Hlt => (0, Some(0)),
            Opcode::Add => (1, None),
            Opcode::Sub => (2, None),
            Opcode::Sta => (3, None),
            Opcode::Lda => (5, None),
            Opcode::Bra => (6, None),
            Opcode::Brz => (7, None),
            Opcode::Brp => (8, None),
            Opcode::Nop => (4, Some(0)),
            Opcode::Pop => (4, Some(1)),
            Opcode::Psh => (4, Some(2)),
            Opcode::LdaPc => (4, Some(3)),
            Opcode::LdaAcc => (4, Some(4)),
            Opcode::Ret => (4, Some(5)),
            Opcode::Inp => (9, Some(1)),
            Opcode::Out => (9, Some(2)),
            Opcode::OutC => (9, Some(3)),
            Opcode::Dat => return None,
        })
    }

    /// Packs an instruction into a single word. `DAT` stores its operand raw.
    ///
    /// The caller guarantees `0 <= operand < OPERAND_LIMIT` for address ops.
    pub fn encode(self, operand: i64) -> i64 {
        match self.encoding() {
            Some((digit, Some(fixed))) => digit * OPERAND_LIMIT + fixed,
            Some((digit, None)) => digit * OPERAND_LIMIT + operand,
            None => operand,
        }
    }

    /// Splits a word back into an operation and its operand.
    ///
    /// Any word with digit 0 halts, as on the classic machine. Returns `None`
    /// for words outside `0..WORD_LIMIT` and for unassigned extended codes.
    pub fn decode(word: i64) -> Option<(Opcode, i64)> {
        if !(0..WORD_LIMIT).contains(&word) {
            return None;
        }
        let digit = word / OPERAND_LIMIT;
        let operand = word % OPERAND_LIMIT;

        let op = match (digit, operand) {
            (0, _) => Opcode::Hlt,
            (1, _) => Opcode::Add,
            (2, _) => Opcode::Sub,
            (3, _) => Opcode::Sta,
            (5, _) => Opcode::Lda,
            (6, _) => Opcode::Bra,
            (7, _) => Opcode::Brz,
            (8, _) => Opcode::Brp,
            (4, 0) => Opcode::Nop,
            (4, 1) => Opcode::Pop,
            (4, 2) => Opcode::Psh,
            (4, 3) => Opcode::LdaPc,
            (4, 4) => Opcode::LdaAcc,
            (4, 5) => Opcode::Ret,
            (9, 1) => Opcode::Inp,
            (9, 2) => Opcode::Out,
            (9, 3) => Opcode::OutC,
            _ => return None,
        };

        Some((op, operand))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_lookup_is_case_insensitive() {
        assert_eq!(Opcode::from_mnemonic("lda"), Some(Opcode::Lda));
        assert_eq!(Opcode::from_mnemonic("LdAcC"), Some(Opcode::LdaAcc));
        assert_eq!(Opcode::from_mnemonic("outc"), Some(Opcode::OutC));
        assert_eq!(Opcode::from_mnemonic("loop_0_start"), None);
    }

    #[test]
    fn test_encode_address_ops() {
        assert_eq!(Opcode::Add.encode(12), 1012);
        assert_eq!(Opcode::Lda.encode(999), 5999);
        assert_eq!(Opcode::Brp.encode(0), 8000);
    }

    #[test]
    fn test_encode_extended_ignores_operand() {
        assert_eq!(Opcode::Psh.encode(0), 4002);
        assert_eq!(Opcode::OutC.encode(0), 9003);
        assert_eq!(Opcode::Hlt.encode(0), 0);
    }

    #[test]
    fn test_dat_is_stored_raw() {
        assert_eq!(Opcode::Dat.encode(-42), -42);
        assert_eq!(Opcode::Dat.encode(123_456), 123_456);
    }

    #[test]
    fn test_decode_every_encodable_op() {
        for op in Opcode::ALL {
            if op == Opcode::Dat {
                continue;
            }
            let word = op.encode(7);
            let (decoded, _) = Opcode::decode(word).expect("word should decode");
            assert_eq!(decoded, op, "word {}", word);
        }
    }

    #[test]
    fn test_decode_rejects_unassigned_words() {
        assert_eq!(Opcode::decode(-1), None);
        assert_eq!(Opcode::decode(4009), None);
        assert_eq!(Opcode::decode(9000), None);
        assert_eq!(Opcode::decode(WORD_LIMIT), None);
    }

    #[test]
    fn test_digit_zero_always_halts() {
        assert_eq!(Opcode::decode(0), Some((Opcode::Hlt, 0)));
        assert_eq!(Opcode::decode(42), Some((Opcode::Hlt, 42)));
    }
}
