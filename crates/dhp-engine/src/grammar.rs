//! The grammar runtime: the shared, mutable context for one parse.

use std::collections::HashMap;

use dhp_core::{Error, Input, Interner, Node, NodeValue, RootNode, Severity, Symbol};
use indexmap::IndexMap;

use crate::capture::CaptureStacks;
use crate::checkpoint::Checkpoint;
use crate::effect::{EffectLog, Undo};
use crate::error::GrammarError;
use crate::memo::{MemoEntry, MemoTable};
use crate::parser::{Parser, ParserId, ParserKind, RecoveryRule};
use crate::reduction::{self, ReductionLevel};

/// Error code used for the mandatory-marker default message when no
/// per-symbol message is configured.
const DEFAULT_MANDATORY_ERROR_CODE: u32 = 1000;
/// Error code for the "empty repetition body" notice (§4.1 ZeroOrMore).
const EMPTY_REPETITION_NOTICE_CODE: u32 = 1;
/// Error code for an empty Capture (§4.2).
const EMPTY_CAPTURE_WARNING_CODE: u32 = 100;
/// Fatal code for an unbalanced capture stack at end of parse (§4.2).
const UNBALANCED_CAPTURE_FATAL_CODE: u32 = 10_000;
/// Fatal code for the dropout counter exceeding its maximum (§4.5).
const DROPOUT_EXCEEDED_FATAL_CODE: u32 = 10_001;
/// Fatal code for a cancelled parse (§5).
const CANCELLED_FATAL_CODE: u32 = 10_002;

/// The shared runtime context for one parse: the parser graph plus every
/// piece of mutable state a parse touches. Reset between parses rather
/// than reconstructed, so a grammar can be reused cheaply.
pub struct Grammar {
    parsers: Vec<Parser>,
    root: ParserId,
    symbols: IndexMap<Symbol, ParserId>,
    interner: Interner,
    reduction_level: ReductionLevel,
    max_dropout: u32,

    // Runtime state, reset at the start of every `parse()` call.
    memo: MemoTable,
    effects: EffectLog,
    captures: CaptureStacks,
    farthest_failure: usize,
    memo_suspend_depth: u32,
    moving_forward: bool,
    lr_in_progress: HashMap<(ParserId, usize), bool>,
    lr_seed: HashMap<(ParserId, usize), (Option<Node>, usize)>,
    dropout_count: u32,
    emitted_empty_repetition_notice: bool,
    errors: Vec<Error>,
    zombie_counter: u32,
}

impl Grammar {
    pub fn new(
        parsers: Vec<Parser>,
        root: ParserId,
        symbols: IndexMap<Symbol, ParserId>,
        interner: Interner,
    ) -> Self {
        Self {
            parsers,
            root,
            symbols,
            interner,
            reduction_level: ReductionLevel::default(),
            max_dropout: 50,
            memo: MemoTable::new(),
            effects: EffectLog::new(),
            captures: CaptureStacks::new(),
            farthest_failure: 0,
            memo_suspend_depth: 0,
            moving_forward: true,
            lr_in_progress: HashMap::new(),
            lr_seed: HashMap::new(),
            dropout_count: 0,
            emitted_empty_repetition_notice: false,
            errors: Vec::new(),
            zombie_counter: 0,
        }
    }

    pub fn with_reduction_level(mut self, level: ReductionLevel) -> Self {
        self.reduction_level = level;
        self
    }

    pub fn with_max_dropout(mut self, max_dropout: u32) -> Self {
        self.max_dropout = max_dropout;
        self
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    pub fn parser(&self, id: ParserId) -> &Parser {
        &self.parsers[id.0 as usize]
    }

    pub fn symbol_id(&self, symbol: Symbol) -> Option<ParserId> {
        self.symbols.get(&symbol).copied()
    }

    pub fn root_id(&self) -> ParserId {
        self.root
    }

    pub fn parser_count(&self) -> usize {
        self.parsers.len()
    }

    pub fn symbols(&self) -> &IndexMap<Symbol, ParserId> {
        &self.symbols
    }

    /// Reset all per-parse runtime state. Called automatically at the start
    /// of [`Grammar::parse`]; exposed so a caller can reuse one `Grammar`
    /// across an explicit reset/parse cycle instead of rebuilding it.
    pub fn reset(&mut self) {
        self.memo.clear();
        self.effects = EffectLog::new();
        self.captures = CaptureStacks::new();
        self.farthest_failure = 0;
        self.memo_suspend_depth = 0;
        self.moving_forward = true;
        self.lr_in_progress.clear();
        self.lr_seed.clear();
        self.dropout_count = 0;
        self.emitted_empty_repetition_notice = false;
        self.errors.clear();
        self.zombie_counter = 0;
    }

    /// Parse the given input from the start, returning the completed tree
    /// and error list as a [`RootNode`].
    ///
    /// Optionally polls `cancel` between top-level combinator calls; if it
    /// ever returns true the parse stops with its partial tree and a fatal
    /// cancellation error.
    pub fn parse(&mut self, input: &Input) -> RootNode {
        self.parse_cancellable(input, || false)
    }

    pub fn parse_cancellable(&mut self, input: &Input, mut cancel: impl FnMut() -> bool) -> RootNode {
        self.reset();

        let root = self.root;
        let (node, end) = self.parse_at(input, root, 0, &mut cancel);

        if !self.captures.is_balanced() {
            for symbol in self.captures.non_empty_symbols() {
                self.errors.push(
                    Error::new(
                        UNBALANCED_CAPTURE_FATAL_CODE,
                        end,
                        format!(
                            "capture stack for {:?} was not empty at end of parse",
                            self.interner.try_resolve(symbol)
                        ),
                    )
                    .with_related_node(symbol),
                );
            }
        }

        let tree = node.unwrap_or_else(|| {
            Node::leaf(None, String::new(), 0).set_disposable(true)
        });
        let tree = reduction::reduce(tree, self.reduction_level);

        RootNode::new(tree, input.line_starts().to_vec(), "cst").with_errors(self.errors.clone())
    }

    /// Validate the grammar against the checks that do not require crate
    /// boundaries this module doesn't own (full static analysis lives in
    /// [`crate::analysis`]); here we only check that every `Forward` was
    /// resolved, the minimum needed for `parse()` to be sound.
    pub fn check_forwards_resolved(&self) -> Result<(), GrammarError> {
        for parser in &self.parsers {
            if let ParserKind::Forward(target) = &parser.kind
                && target.get().is_none()
            {
                return Err(GrammarError::UnresolvedForward(parser.name));
            }
        }
        Ok(())
    }

    fn record_failure(&mut self, location: usize) {
        if location > self.farthest_failure {
            self.farthest_failure = location;
        }
    }

    /// Memoization is suspended both for explicitly nested zero-width
    /// evaluations (Lookahead/Lookbehind) or capture-sensitive regions, and
    /// implicitly for any call made while a left-recursive head is still
    /// being grown: intermediate results computed during growth are
    /// provisional and must not be memoized as final, or later growth
    /// iterations would read back stale results instead of recomputing
    /// against the newly grown seed.
    fn memo_suspended(&self) -> bool {
        self.memo_suspend_depth > 0 || !self.lr_in_progress.is_empty()
    }

    /// Core dispatch: parse `id` at `location`, applying packrat memoization
    /// and the seed-and-grow left-recursion protocol around the underlying
    /// combinator logic in [`Grammar::dispatch`].
    fn parse_at(
        &mut self,
        input: &Input,
        id: ParserId,
        location: usize,
        cancel: &mut impl FnMut() -> bool,
    ) -> (Option<Node>, usize) {
        if cancel() {
            self.errors.push(Error::new(
                CANCELLED_FATAL_CODE,
                location,
                "parse cancelled",
            ));
            return (None, location);
        }

        if !self.memo_suspended()
            && let Some(entry) = self.memo.get(id, location)
        {
            return (entry.node.clone(), entry.new_location);
        }

        if let Some(detected) = self.lr_in_progress.get_mut(&(id, location)) {
            *detected = true;
            return self
                .lr_seed
                .get(&(id, location))
                .cloned()
                .unwrap_or((None, location));
        }

        self.lr_in_progress.insert((id, location), false);
        self.lr_seed.insert((id, location), (None, location));

        let mut result = self.dispatch(input, id, location, cancel);

        let detected = self
            .lr_in_progress
            .remove(&(id, location))
            .unwrap_or(false);
        self.lr_seed.remove(&(id, location));

        if detected {
            loop {
                if result.1 <= location && result.0.is_none() {
                    break;
                }
                let grown_further = self
                    .lr_seed
                    .get(&(id, location))
                    .map(|(_, loc)| result.1 > *loc)
                    .unwrap_or(true);
                if !grown_further {
                    break;
                }
                self.lr_seed.insert((id, location), result.clone());
                self.lr_in_progress.insert((id, location), false);
                let next = self.dispatch(input, id, location, cancel);
                self.lr_in_progress.remove(&(id, location));
                if next.1 > result.1 {
                    result = next;
                } else {
                    break;
                }
            }
            self.lr_seed.remove(&(id, location));
        }

        if !self.memo_suspended() {
            self.memo.insert(
                id,
                location,
                MemoEntry {
                    node: result.0.clone(),
                    new_location: result.1,
                    errors: Vec::new(),
                },
            );
        }

        result
    }

    /// The actual combinator logic for every [`ParserKind`] variant, with
    /// no memoization or left-recursion bookkeeping — that wrapping lives
    /// in [`Grammar::parse_at`].
    fn dispatch(
        &mut self,
        input: &Input,
        id: ParserId,
        location: usize,
        cancel: &mut impl FnMut() -> bool,
    ) -> (Option<Node>, usize) {
        let parser = self.parsers[id.0 as usize].clone();
        let name = parser.name;

        let (value, end) = match &parser.kind {
            ParserKind::Text(text) => {
                if input.as_str()[location..].starts_with(text.as_str()) {
                    (Some(NodeValue::Leaf(text.clone())), location + text.len())
                } else {
                    self.record_failure(location);
                    (None, location)
                }
            }

            ParserKind::RegExp { pattern, .. } => {
                match pattern.find_from_pos(input.as_str(), location) {
                    Ok(Some(m)) if m.start() == location => {
                        (Some(NodeValue::Leaf(m.as_str().to_string())), m.end())
                    }
                    _ => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::PreprocessorToken(_token_name) => {
                self.record_failure(location);
                (None, location)
            }

            ParserKind::Option(inner) => {
                let inner = *inner;
                let (node, end) = self.parse_at(input, inner, location, cancel);
                match node {
                    Some(n) => (Some(NodeValue::Children(vec![n])), end),
                    None => (Some(NodeValue::Children(vec![])), location),
                }
            }

            ParserKind::ZeroOrMore(inner) => {
                let inner = *inner;
                let (children, end) = self.repeat(input, inner, location, 0, None, cancel);
                (Some(NodeValue::Children(children)), end)
            }

            ParserKind::OneOrMore(inner) => {
                let inner = *inner;
                let (children, end) = self.repeat(input, inner, location, 1, None, cancel);
                if children.is_empty() {
                    self.record_failure(location);
                    (None, location)
                } else {
                    (Some(NodeValue::Children(children)), end)
                }
            }

            ParserKind::Counted { inner, range } => {
                let inner = *inner;
                let range = *range;
                let (children, end) =
                    self.repeat(input, inner, location, range.min, range.max, cancel);
                if range.contains(children.len()) {
                    (Some(NodeValue::Children(children)), end)
                } else {
                    self.record_failure(location);
                    (None, location)
                }
            }

            ParserKind::Series {
                parts,
                mandatory_index,
                skip,
                error_message,
            } => {
                let parts = parts.clone();
                let mandatory_index = *mandatory_index;
                let skip = skip.clone();
                let error_message = error_message.clone();
                self.parse_series(
                    input,
                    &parts,
                    mandatory_index,
                    &skip,
                    error_message.as_deref(),
                    location,
                    cancel,
                )
            }

            ParserKind::Alternative(branches) => {
                let branches = branches.clone();
                match self.parse_alternative(input, &branches, location, cancel) {
                    Some((node, end)) => (Some(NodeValue::Children(vec![node])), end),
                    None => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::TextAlternative {
                by_first_byte,
                fallback,
            } => {
                let branches: Vec<ParserId> = input
                    .as_str()
                    .as_bytes()
                    .get(location)
                    .and_then(|b| by_first_byte.iter().find(|(byte, _)| byte == b))
                    .map(|(_, ids)| ids.clone())
                    .unwrap_or_else(|| fallback.clone());
                match self.parse_alternative(input, &branches, location, cancel) {
                    Some((node, end)) => (Some(NodeValue::Children(vec![node])), end),
                    None => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::Interleave(operands) => {
                let operands = operands.clone();
                match self.parse_interleave(input, &operands, location, cancel) {
                    Some((children, end)) => (Some(NodeValue::Children(children)), end),
                    None => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::Lookahead { inner, negative } => {
                let inner = *inner;
                let negative = *negative;
                let checkpoint = self.save_checkpoint(location);
                self.memo_suspend_depth += 1;
                let (node, _) = self.parse_at(input, inner, location, cancel);
                self.memo_suspend_depth -= 1;
                self.restore_checkpoint(checkpoint);
                let matched = node.is_some();
                if matched != negative {
                    (Some(NodeValue::Children(vec![])), location)
                } else {
                    self.record_failure(location);
                    (None, location)
                }
            }

            ParserKind::Lookbehind { inner, negative } => {
                let inner = *inner;
                let negative = *negative;
                let reversed = input.reversed();
                let reversed_input = Input::new(reversed);
                let reversed_location = input.len() - location;
                let checkpoint = self.save_checkpoint(reversed_location);
                self.memo_suspend_depth += 1;
                let (node, _) = self.parse_at(&reversed_input, inner, reversed_location, cancel);
                self.memo_suspend_depth -= 1;
                self.restore_checkpoint(checkpoint);
                let matched = node.is_some();
                if matched != negative {
                    (Some(NodeValue::Children(vec![])), location)
                } else {
                    self.record_failure(location);
                    (None, location)
                }
            }

            ParserKind::Synonym(inner) => {
                let inner = *inner;
                let (node, end) = self.parse_at(input, inner, location, cancel);
                match node {
                    Some(n) => (Some(NodeValue::Children(vec![n])), end),
                    None => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::Forward(target) => match target.get() {
                Some(target_id) => {
                    let (node, end) = self.parse_at(input, target_id, location, cancel);
                    match node {
                        Some(n) => (Some(NodeValue::Children(vec![n])), end),
                        None => {
                            self.record_failure(location);
                            (None, location)
                        }
                    }
                }
                None => {
                    self.record_failure(location);
                    (None, location)
                }
            },

            ParserKind::Capture { symbol, inner } => {
                let symbol = *symbol;
                let inner = *inner;
                self.memo_suspend_depth += 1;
                let (node, end) = self.parse_at(input, inner, location, cancel);
                self.memo_suspend_depth -= 1;
                match node {
                    Some(n) => {
                        let text = input.slice(location, end).to_string();
                        if text.is_empty() && !self.emitted_empty_repetition_notice {
                            self.errors.push(Error::new(
                                EMPTY_CAPTURE_WARNING_CODE,
                                location,
                                "empty capture",
                            ));
                        }
                        self.captures.push(symbol, text);
                        self.effects.push(Undo::Push(symbol));
                        (Some(NodeValue::Children(vec![n])), end)
                    }
                    None => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::Retrieve { symbol, filter } => {
                let symbol = *symbol;
                let filter = *filter;
                match self.retrieve(input, symbol, filter, location) {
                    Some(end) => (Some(NodeValue::Leaf(input.slice(location, end).to_string())), end),
                    None => {
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }

            ParserKind::Pop {
                symbol,
                filter,
                pop_on_failure,
            } => {
                let symbol = *symbol;
                let filter = *filter;
                let pop_on_failure = *pop_on_failure;
                match self.retrieve(input, symbol, filter, location) {
                    Some(end) => {
                        if let Some(value) = self.captures.pop(symbol) {
                            self.effects.push(Undo::Pop(symbol, value));
                        }
                        (Some(NodeValue::Leaf(input.slice(location, end).to_string())), end)
                    }
                    None => {
                        if pop_on_failure
                            && let Some(value) = self.captures.pop(symbol)
                        {
                            self.effects.push(Undo::Pop(symbol, value));
                        }
                        self.record_failure(location);
                        (None, location)
                    }
                }
            }
        };

        match value {
            Some(value) => {
                let node = Node {
                    name,
                    value,
                    position: location,
                    attributes: None,
                    disposable: parser.disposable,
                };
                let node = if parser.drop_content {
                    Node {
                        value: NodeValue::Leaf(String::new()),
                        ..node
                    }
                } else {
                    node
                };
                (Some(node), end)
            }
            None => (None, location),
        }
    }

    fn retrieve(
        &self,
        input: &Input,
        symbol: Symbol,
        filter: Option<Symbol>,
        location: usize,
    ) -> Option<usize> {
        let _ = filter; // filter-function registry is a facade-level concern (see dhparser::Directives)
        let captured = self.captures.top(symbol)?;
        if input.as_str()[location..].starts_with(captured) {
            Some(location + captured.len())
        } else {
            None
        }
    }

    fn repeat(
        &mut self,
        input: &Input,
        inner: ParserId,
        location: usize,
        min: usize,
        max: Option<usize>,
        cancel: &mut impl FnMut() -> bool,
    ) -> (Vec<Node>, usize) {
        let mut children = Vec::new();
        let mut loc = location;
        loop {
            if max.is_some_and(|max| children.len() >= max) {
                break;
            }
            let checkpoint = self.save_checkpoint(loc);
            let (node, end) = self.parse_at(input, inner, loc, cancel);
            match node {
                Some(n) => {
                    if end == loc {
                        if !self.emitted_empty_repetition_notice {
                            self.errors.push(Error::new(
                                EMPTY_REPETITION_NOTICE_CODE,
                                loc,
                                "repeated parser matched the empty string; stopping to avoid an infinite loop",
                            ));
                            self.emitted_empty_repetition_notice = true;
                        }
                        children.push(n);
                        break;
                    }
                    children.push(n);
                    loc = end;
                }
                None => {
                    // The abandoned iteration may have pushed Capture/Pop
                    // effects before failing partway through; undo them so
                    // they don't leak past this repetition.
                    self.restore_checkpoint(checkpoint);
                    break;
                }
            }
        }
        if children.len() < min {
            (children, location)
        } else {
            (children, loc)
        }
    }

    fn parse_alternative(
        &mut self,
        input: &Input,
        branches: &[ParserId],
        location: usize,
        cancel: &mut impl FnMut() -> bool,
    ) -> Option<(Node, usize)> {
        for &branch in branches {
            let checkpoint = self.save_checkpoint(location);
            let (node, end) = self.parse_at(input, branch, location, cancel);
            if let Some(node) = node {
                return Some((node, end));
            }
            // Undo any Capture/Pop effects the failed branch left behind
            // before trying the next one.
            self.restore_checkpoint(checkpoint);
        }
        None
    }

    fn parse_interleave(
        &mut self,
        input: &Input,
        operands: &[crate::parser::InterleaveOperand],
        location: usize,
        cancel: &mut impl FnMut() -> bool,
    ) -> Option<(Vec<Node>, usize)> {
        let mut counts = vec![0usize; operands.len()];
        let mut children = Vec::new();
        let mut loc = location;

        loop {
            let mut progressed = false;
            for (i, op) in operands.iter().enumerate() {
                if op.range.max.is_some_and(|max| counts[i] >= max) {
                    continue;
                }
                let (node, end) = self.parse_at(input, op.parser, loc, cancel);
                if let Some(node) = node {
                    children.push(node);
                    counts[i] += 1;
                    loc = end;
                    progressed = true;
                    break;
                }
            }
            if !progressed {
                break;
            }
        }

        for (i, op) in operands.iter().enumerate() {
            if counts[i] < op.range.min {
                return None;
            }
        }

        Some((children, loc))
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_series(
        &mut self,
        input: &Input,
        parts: &[ParserId],
        mandatory_index: usize,
        skip: &[RecoveryRule],
        error_message: Option<&str>,
        location: usize,
        cancel: &mut impl FnMut() -> bool,
    ) -> (Option<NodeValue>, usize) {
        let mut children = Vec::new();
        let mut loc = location;

        for (i, &part) in parts.iter().enumerate() {
            let (node, end) = self.parse_at(input, part, loc, cancel);
            match node {
                Some(n) => {
                    children.push(n);
                    loc = end;
                }
                None => {
                    if i < mandatory_index {
                        return (None, location);
                    }

                    self.dropout_count += 1;
                    if self.dropout_count > self.max_dropout {
                        self.errors.push(Error::new(
                            DROPOUT_EXCEEDED_FATAL_CODE,
                            loc,
                            "dropout counter exceeded maximum; parse abandoned",
                        ));
                        children.push(self.zombie_node(loc));
                        return (Some(NodeValue::Children(children)), loc);
                    }

                    let message = error_message
                        .map(str::to_string)
                        .unwrap_or_else(|| "mandatory element did not match".to_string());
                    self.errors.push(Error::new(
                        DEFAULT_MANDATORY_ERROR_CODE,
                        loc,
                        message,
                    ));

                    match self.scan_skip(input, skip, loc) {
                        Some(new_loc) => {
                            children.push(self.zombie_node(loc));
                            loc = new_loc;
                        }
                        None => {
                            children.push(self.zombie_node(loc));
                            return (Some(NodeValue::Children(children)), loc);
                        }
                    }
                }
            }
        }

        (Some(NodeValue::Children(children)), loc)
    }

    fn scan_skip(&mut self, input: &Input, skip: &[RecoveryRule], from: usize) -> Option<usize> {
        for rule in skip {
            match rule {
                RecoveryRule::Pattern(pattern) => {
                    if let Ok(Some(m)) = pattern.find_from_pos(input.as_str(), from)
                        && m.start() >= from
                    {
                        return Some(m.end());
                    }
                }
                RecoveryRule::Parser(parser_id) => {
                    let mut noop_cancel = || false;
                    let (node, end) = self.parse_at(input, *parser_id, from, &mut noop_cancel);
                    if node.is_some() {
                        return Some(end);
                    }
                }
            }
        }
        None
    }

    fn zombie_node(&mut self, location: usize) -> Node {
        self.zombie_counter += 1;
        Node::leaf(None, String::new(), location).set_disposable(false)
    }

    fn save_checkpoint(&mut self, location: usize) -> Checkpoint {
        Checkpoint::new(location, self.effects.len())
    }

    fn restore_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.effects.rollback_to(checkpoint.effect_watermark, &mut self.captures);
    }
}

/// Resolve a `code`'s severity, matching [`Severity::from_code`] — exposed
/// here since grammar-level recovery code chooses error codes directly.
pub fn severity_of(code: u32) -> Severity {
    Severity::from_code(code)
}
