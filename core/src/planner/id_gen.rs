use crate::executor::types::TaskKind;

/// Deterministic task id source: `{kind-slug}-{n}` with one counter shared by
/// every kind, starting at 1.
#[derive(Debug, Default)]
pub struct TaskIdGen {
    counter: u32,
}

impl TaskIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, kind: TaskKind) -> String {
        self.counter += 1;
        format!("{}-{}", kind.slug(), self.counter)
    }
}
