//! Grammar-wide configuration pragmas (DHParser's `@` directives), in a
//! serializable form so a grammar's ambient configuration can travel as
//! JSON alongside (or instead of) Rust combinator code.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which side(s) of a literal string token implicit whitespace is consumed
/// on, mirroring the `@literalws` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiteralWhitespace {
    None,
    Left,
    Right,
    #[default]
    Both,
}

/// A serializable mirror of [`dhp_engine::ReductionLevel`]; kept separate
/// so the engine's enum doesn't need to carry `serde` derives for a
/// facade-only concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReductionLevelConfig {
    None,
    #[default]
    Flatten,
    MergeTreetops,
    Merge,
}

impl From<ReductionLevelConfig> for dhp_engine::ReductionLevel {
    fn from(value: ReductionLevelConfig) -> Self {
        match value {
            ReductionLevelConfig::None => dhp_engine::ReductionLevel::None,
            ReductionLevelConfig::Flatten => dhp_engine::ReductionLevel::Flatten,
            ReductionLevelConfig::MergeTreetops => dhp_engine::ReductionLevel::MergeTreetops,
            ReductionLevelConfig::Merge => dhp_engine::ReductionLevel::Merge,
        }
    }
}

/// Grammar-wide settings that in a textual EBNF grammar would be written
/// as `@` pragmas at the top of the file. A builder applies these once to
/// every parser it creates, rather than each combinator call repeating
/// them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Directives {
    /// Regex pattern matching insignificant whitespace between tokens.
    pub whitespace: Option<String>,
    /// Regex pattern matching comments, skipped wherever whitespace is.
    pub comment: Option<String>,
    pub literal_whitespace: LiteralWhitespace,
    pub case_insensitive: bool,
    /// Symbol names whose matched content is dropped (kept as an empty,
    /// disposable placeholder) rather than appearing in the tree.
    pub drop: Vec<String>,
    /// Regex matched against a symbol's name to decide if it is disposable
    /// (typically matching the convention of a leading underscore).
    pub disposable_name_pattern: Option<String>,
    pub reduction_level: ReductionLevelConfig,
    /// Per-symbol override for the mandatory-marker error message.
    pub error_messages: IndexMap<String, String>,
    /// Per-symbol ordered list of skip-recovery regex patterns.
    pub skip: IndexMap<String, Vec<String>>,
    /// Per-symbol ordered list of resume-recovery regex patterns. Recorded
    /// for completeness with the rest of the `@` pragma surface; the engine
    /// does not implement non-local resume recovery (see the design notes),
    /// so this configuration is not currently consumed by the builder.
    pub resume: IndexMap<String, Vec<String>>,
    /// Per-symbol name of a registered filter function applied to
    /// `Retrieve`/`Pop` matches (e.g. case-normalization before
    /// comparison). Filter functions themselves are a caller-supplied
    /// registry, not something this format can serialize.
    pub filters: IndexMap<String, String>,
    /// Names reserved for preprocessor-emitted tokens, consumed by
    /// `ParserKind::PreprocessorToken` rather than matched against source
    /// text directly.
    pub preprocessor_tokens: Vec<String>,
}

impl Directives {
    pub fn from_json(text: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut directives = Directives {
            whitespace: Some(r"\s*".to_string()),
            case_insensitive: true,
            ..Default::default()
        };
        directives
            .skip
            .insert("object".to_string(), vec![r"[^}]*\}".to_string()]);

        let json = directives.to_json().unwrap();
        let restored = Directives::from_json(&json).unwrap();
        assert_eq!(restored.whitespace, directives.whitespace);
        assert_eq!(restored.skip.get("object"), directives.skip.get("object"));
    }

    #[test]
    fn defaults_are_permissive() {
        let directives = Directives::default();
        assert_eq!(directives.literal_whitespace, LiteralWhitespace::Both);
        assert_eq!(directives.reduction_level, ReductionLevelConfig::Flatten);
        assert!(directives.drop.is_empty());
    }
}
