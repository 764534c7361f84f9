/// Monotonic id counters for generated labels.
///
/// One allocator belongs to one compilation, so every `temp_N`, `loop_N`,
/// `if_N` and `assert_N` is unique across all scopes of that program and
/// independent compilations never share state.
#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    temp: usize,
    loops: usize,
    ifs: usize,
    asserts: usize,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_temp(&mut self) -> usize {
        bump(&mut self.temp)
    }

    pub fn next_loop(&mut self) -> usize {
        bump(&mut self.loops)
    }

    pub fn next_if(&mut self) -> usize {
        bump(&mut self.ifs)
    }

    pub fn next_assert(&mut self) -> usize {
        bump(&mut self.asserts)
    }

    /// Temps handed out so far.
    pub fn temps(&self) -> usize {
        self.temp
    }
}

fn bump(counter: &mut usize) -> usize {
    let id = *counter;
    *counter += 1;
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let mut labels = LabelAllocator::new();
        assert_eq!(labels.next_temp(), 0);
        assert_eq!(labels.next_temp(), 1);
        assert_eq!(labels.next_loop(), 0);
        assert_eq!(labels.next_if(), 0);
        assert_eq!(labels.next_temp(), 2);
        assert_eq!(labels.next_assert(), 0);
        assert_eq!(labels.temps(), 3);
    }

    #[test]
    fn test_fresh_allocators_restart() {
        let mut first = LabelAllocator::new();
        first.next_loop();
        first.next_loop();
        let mut second = LabelAllocator::new();
        assert_eq!(second.next_loop(), 0);
    }
}
