//! Tracebacks: how one sequence maps onto the model's states.

/// State label for one traceback step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// Begin.
    B,
    /// Match at a node.
    M,
    /// Insert after a node.
    I,
    /// Delete at a node.
    D,
    /// End.
    E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStep {
    pub state: TraceState,
    /// Model node index; 0 for B/E.
    pub node: usize,
    /// Alignment column (or sequence position) of the emitted residue;
    /// 0 for non-emitting states.
    pub col: usize,
}

/// Ordered state path of one sequence through the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
    /// Model length the trace refers to.
    pub m: usize,
    /// Number of residues the trace accounts for.
    pub l: usize,
}

impl Trace {
    pub fn new() -> Trace {
        Trace { steps: Vec::new(), m: 0, l: 0 }
    }

    pub fn append(&mut self, state: TraceState, node: usize, col: usize) {
        self.steps.push(TraceStep { state, node, col });
    }

    /// Trivial linear trace for a single query sequence:
    /// B -> M_1 .. M_L -> E.
    pub fn faux(l: usize) -> Trace {
        let mut tr = Trace::new();
        tr.append(TraceState::B, 0, 0);
        for k in 1..=l {
            tr.append(TraceState::M, k, k);
        }
        tr.append(TraceState::E, 0, 0);
        tr.m = l;
        tr.l = l;
        tr
    }
}

impl Default for Trace {
    fn default() -> Self {
        Trace::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faux_trace_shape() {
        let tr = Trace::faux(4);
        assert_eq!(tr.m, 4);
        assert_eq!(tr.l, 4);
        assert_eq!(tr.steps.len(), 6);
        assert_eq!(tr.steps[0].state, TraceState::B);
        assert_eq!(tr.steps[5].state, TraceState::E);
        assert_eq!(tr.steps[2], TraceStep { state: TraceState::M, node: 2, col: 2 });
    }
}
