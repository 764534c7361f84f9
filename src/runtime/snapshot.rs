use serde::{Deserialize, Serialize};

/// Where the machine stands between two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Running,
    Halted,
    /// An `INP` found no value; the program counter still points at it.
    AwaitingInput,
}

/// An owned copy of the full machine state.
///
/// Snapshots never alias the live machine, so a host can keep a history of
/// them for rewinding or ship one across a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub memory: Vec<i64>,
    pub accumulator: i64,
    pub pc: usize,
    pub stack: Vec<i64>,
    pub status: Status,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_bytes_restore_equal_value() {
        let snap = Snapshot {
            memory: vec![5003, 9002, 0, -17],
            accumulator: -17,
            pc: 2,
            stack: vec![4, 900],
            status: Status::AwaitingInput,
        };
        let bytes = snap.to_bytes().unwrap();
        assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snap);
    }

    #[test]
    fn test_truncated_bytes_are_rejected() {
        let snap = Snapshot {
            memory: vec![1, 2, 3],
            accumulator: 0,
            pc: 0,
            stack: Vec::new(),
            status: Status::Running,
        };
        let bytes = snap.to_bytes().unwrap();
        assert!(Snapshot::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
