//! Backtracking checkpoints: the state a compound combinator saves before
//! trying a sub-parse it might abandon.

/// A saved point a combinator can roll back to after an abandoned attempt.
///
/// Input location needs no explicit restoration here: every combinator
/// tracks its own position in a local variable rather than through a shared
/// cursor, so "restoring" it is just not advancing past `location`. The one
/// piece of state that genuinely outlives a single combinator call and must
/// be rolled back explicitly is the capture-stack effect log, which
/// `Grammar::restore_checkpoint` truncates back to `effect_watermark`.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint {
    pub location: usize,
    pub effect_watermark: usize,
}

impl Checkpoint {
    pub fn new(location: usize, effect_watermark: usize) -> Self {
        Self {
            location,
            effect_watermark,
        }
    }
}
