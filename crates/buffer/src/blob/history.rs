/// Kind of an edit operation on a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Replace,
    Insert,
    Delete,
}

/// A recorded edit that reverses one operation. Carries the bytes needed to
/// restore the previous state only when applying it requires them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Diff {
    Replace { pos: usize, data: Box<[u8]> },
    Insert { pos: usize, data: Box<[u8]> },
    Delete { pos: usize, len: usize },
}

impl Diff {
    /// Create the diff that undoes `op` at `pos..pos + len`. Must be called
    /// with the content as it is before `op` is applied.
    pub fn reversing(op: Op, pos: usize, len: usize, content: &[u8]) -> Diff {
        let snapshot = || Box::<[u8]>::from(&content[pos..pos + len]);

        match op {
            Op::Replace => Diff::Replace {
                pos,
                data: snapshot(),
            },
            Op::Insert => Diff::Delete { pos, len },
            Op::Delete => Diff::Insert {
                pos,
                data: snapshot(),
            },
        }
    }

    pub fn op(&self) -> Op {
        match self {
            Diff::Replace { .. } => Op::Replace,
            Diff::Insert { .. } => Op::Insert,
            Diff::Delete { .. } => Op::Delete,
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            Diff::Replace { pos, .. } | Diff::Insert { pos, .. } | Diff::Delete { pos, .. } => *pos,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Diff::Replace { data, .. } | Diff::Insert { data, .. } => data.len(),
            Diff::Delete { len, .. } => *len,
        }
    }
}

/// Which way to move in history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Undo,
    Redo,
}

/// Undo and redo stacks, most recent diff last
#[derive(Debug, Default)]
pub(crate) struct History {
    undo: Vec<Diff>,
    redo: Vec<Diff>,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    /// Record a new forward edit. Branching history has no redo path so the
    /// redo stack is dropped.
    pub fn record(&mut self, op: Op, pos: usize, len: usize, content: &[u8]) {
        self.redo.clear();
        self.undo.push(Diff::reversing(op, pos, len, content));
    }

    /// Source and target stacks for a step
    pub fn stacks(&mut self, step: Step) -> (&mut Vec<Diff>, &mut Vec<Diff>) {
        match step {
            Step::Undo => (&mut self.undo, &mut self.redo),
            Step::Redo => (&mut self.redo, &mut self.undo),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}
