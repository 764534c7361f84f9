/// Branch targets of one enclosing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLabels {
    /// The loop's label prefix, e.g. `loop_2`.
    pub label: String,
    /// Where `continue` goes: the loop's condition re-check.
    pub continue_target: String,
}

impl LoopLabels {
    pub fn break_target(&self) -> String {
        format!("{}_end", self.label)
    }
}

/// Stack of enclosing loops, independent of lexical scoping.
///
/// `break` and `continue` bind to the innermost entry no matter how many
/// `if` blocks sit between them and the loop.
#[derive(Debug, Clone, Default)]
pub struct WeakScopes {
    stack: Vec<LoopLabels>,
}

impl WeakScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, label: &str, continue_target: String) {
        self.stack.push(LoopLabels {
            label: label.to_string(),
            continue_target,
        });
    }

    pub fn leave(&mut self) -> Option<LoopLabels> {
        self.stack.pop()
    }

    pub fn current(&self) -> Option<&LoopLabels> {
        self.stack.last()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Empty the stack, returning whatever was left open.
    pub fn drain_leaked(&mut self) -> Vec<LoopLabels> {
        std::mem::take(&mut self.stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_loop_wins() {
        let mut weak = WeakScopes::new();
        weak.enter("loop_0", "loop_0_start".to_string());
        weak.enter("loop_1", "loop_1_step".to_string());

        let current = weak.current().unwrap();
        assert_eq!(current.break_target(), "loop_1_end");
        assert_eq!(current.continue_target, "loop_1_step");

        weak.leave();
        assert_eq!(weak.current().unwrap().break_target(), "loop_0_end");
        weak.leave();
        assert!(weak.is_empty());
        assert!(weak.leave().is_none());
    }

    #[test]
    fn test_drain_leaked() {
        let mut weak = WeakScopes::new();
        weak.enter("loop_3", "loop_3_cond".to_string());
        let leaked = weak.drain_leaked();
        assert_eq!(leaked.len(), 1);
        assert_eq!(leaked[0].label, "loop_3");
        assert!(weak.is_empty());
    }
}
