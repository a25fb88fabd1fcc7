//! Boundary-safe, case-adjusting literal replacement.
//!
//! [`TextReplacer`] turns each [`SoundsLikeMapping`] into an escaped regex,
//! collects every match against the unmodified input, then splices the
//! replacements in back-to-front so earlier offsets stay valid.
//!
//! Word boundaries are checked by hand on both edges of every match: a
//! match is kept only when neither neighbouring character is alphanumeric or
//! `_`.  This also holds for variants such as `.net` or `c++`, whose outer
//! characters are punctuation and which `\b` cannot guard.
//!
//! A mapping that cannot be turned into a pattern (blank `sounds_like`,
//! pattern too large) is logged and skipped; it never aborts a batch.

use regex::{Match, Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;

use super::mapping::SoundsLikeMapping;

// ---------------------------------------------------------------------------
// ReplaceError
// ---------------------------------------------------------------------------

/// Errors that prevent a single mapping from being applied.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// The mapping has nothing to match.
    #[error("empty sounds_like for entity {0:?}")]
    EmptyPattern(String),

    /// The escaped pattern failed to compile.
    #[error("failed to compile pattern for {sounds_like:?}: {source}")]
    Compile {
        sounds_like: String,
        #[source]
        source: regex::Error,
    },
}

// ---------------------------------------------------------------------------
// Options / results
// ---------------------------------------------------------------------------

/// Matching behaviour for [`TextReplacer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacerOptions {
    /// Adjust the replacement to the case style of the matched text.
    pub preserve_case: bool,
    /// Refuse matches embedded in a longer word.
    pub use_word_boundaries: bool,
    pub case_insensitive: bool,
    /// Compiled-pattern size limit in bytes; `None` keeps the regex default.
    pub size_limit: Option<usize>,
}

impl Default for ReplacerOptions {
    fn default() -> Self {
        Self {
            preserve_case: true,
            use_word_boundaries: true,
            case_insensitive: true,
            size_limit: None,
        }
    }
}

/// One substitution made in the text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementOccurrence {
    /// Text as matched.
    pub original: String,
    /// Text written in its place.
    pub replacement: String,
    /// Byte offset of the match in the text the mapping was applied to.
    pub position: usize,
    pub mapping: SoundsLikeMapping,
}

/// Outcome of applying one or more mappings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementResult {
    pub text: String,
    pub count: usize,
    pub occurrences: Vec<ReplacementOccurrence>,
    /// Mappings that matched at least once, in application order.
    pub applied_mappings: Vec<SoundsLikeMapping>,
}

impl ReplacementResult {
    /// A result that leaves `text` untouched.
    pub fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            count: 0,
            occurrences: Vec::new(),
            applied_mappings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Case handling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseStyle {
    Upper,
    Lower,
    Title,
    Mixed,
}

fn case_style(s: &str) -> CaseStyle {
    let lower = s.to_lowercase();
    if s == s.to_uppercase() && s != lower {
        CaseStyle::Upper
    } else if s == lower {
        CaseStyle::Lower
    } else if s.chars().next().is_some_and(char::is_uppercase) {
        CaseStyle::Title
    } else {
        CaseStyle::Mixed
    }
}

fn apply_case(replacement: &str, style: CaseStyle) -> String {
    match style {
        CaseStyle::Upper => replacement.to_uppercase(),
        CaseStyle::Lower => replacement.to_lowercase(),
        CaseStyle::Title => {
            let mut chars = replacement.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        CaseStyle::Mixed => replacement.to_string(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `text[start..end]` is not glued to a word character on either side.
fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

// ---------------------------------------------------------------------------
// TextReplacer
// ---------------------------------------------------------------------------

/// Applies sounds-like mappings to text.
///
/// ```rust
/// use sounds_like_correct::correction::{SoundsLikeMapping, TextReplacer};
/// use sounds_like_correct::registry::EntityType;
///
/// let replacer = TextReplacer::default();
/// let mapping = SoundsLikeMapping::new("protocol", "Protokoll", EntityType::Project, "protokoll");
/// let result = replacer.apply_single_replacement("The PROTOCOL says", &mapping);
/// assert_eq!(result.text, "The PROTOKOLL says");
/// assert_eq!(result.count, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextReplacer {
    options: ReplacerOptions,
}

impl TextReplacer {
    pub fn new(options: ReplacerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ReplacerOptions {
        self.options
    }

    /// Compile the match pattern for `sounds_like`.
    ///
    /// The phrase is escaped, so registry content is always matched
    /// literally.  Boundaries are not part of the pattern; see
    /// [`find_matches`](Self::find_matches).
    pub fn build_pattern(&self, sounds_like: &str) -> Result<Regex, ReplaceError> {
        if sounds_like.trim().is_empty() {
            return Err(ReplaceError::EmptyPattern(sounds_like.to_string()));
        }

        let mut builder = RegexBuilder::new(&regex::escape(sounds_like));
        builder.case_insensitive(self.options.case_insensitive);
        if let Some(limit) = self.options.size_limit {
            builder.size_limit(limit);
        }
        builder.build().map_err(|source| ReplaceError::Compile {
            sounds_like: sounds_like.to_string(),
            source,
        })
    }

    /// Non-overlapping matches of `re` in `text`, left to right.
    ///
    /// With word boundaries on, a match touching a word character is dropped
    /// and the search resumes one character after its start, so a bounded
    /// match overlapping the rejected one is still found.
    pub fn find_matches<'t>(&self, re: &Regex, text: &'t str) -> Vec<Match<'t>> {
        if !self.options.use_word_boundaries {
            return re.find_iter(text).collect();
        }

        let mut found = Vec::new();
        let mut at = 0;
        while let Some(m) = re.find_at(text, at) {
            if is_bounded(text, m.start(), m.end()) {
                at = m.end();
                found.push(m);
            } else {
                let step = text[m.start()..].chars().next().map_or(1, char::len_utf8);
                at = m.start() + step;
            }
            if at > text.len() {
                break;
            }
        }
        found
    }

    /// Apply one mapping, reporting pattern failures to the caller.
    pub fn try_apply_single(
        &self,
        text: &str,
        mapping: &SoundsLikeMapping,
    ) -> Result<ReplacementResult, ReplaceError> {
        let re = self.build_pattern(&mapping.sounds_like)?;

        let mut spans: Vec<(usize, usize, String)> = Vec::new();
        let mut occurrences = Vec::new();
        for m in self.find_matches(&re, text) {
            let matched = m.as_str();
            let replacement = if self.options.preserve_case {
                apply_case(&mapping.correct_text, case_style(matched))
            } else {
                mapping.correct_text.clone()
            };
            occurrences.push(ReplacementOccurrence {
                original: matched.to_string(),
                replacement: replacement.clone(),
                position: m.start(),
                mapping: mapping.clone(),
            });
            spans.push((m.start(), m.end(), replacement));
        }

        if spans.is_empty() {
            return Ok(ReplacementResult::unchanged(text));
        }

        let mut out = text.to_string();
        for (start, end, replacement) in spans.iter().rev() {
            out.replace_range(*start..*end, replacement);
        }

        Ok(ReplacementResult {
            text: out,
            count: spans.len(),
            occurrences,
            applied_mappings: vec![mapping.clone()],
        })
    }

    /// Apply one mapping; a mapping that cannot be compiled leaves the text
    /// unchanged and is logged.
    pub fn apply_single_replacement(
        &self,
        text: &str,
        mapping: &SoundsLikeMapping,
    ) -> ReplacementResult {
        match self.try_apply_single(text, mapping) {
            Ok(result) => result,
            Err(e) => {
                log::warn!(
                    "replacer: skipping mapping for entity {:?} ({e})",
                    mapping.entity_id
                );
                ReplacementResult::unchanged(text)
            }
        }
    }

    /// Apply `mappings` in order, each one to the output of the previous.
    pub fn apply_replacements(
        &self,
        text: &str,
        mappings: &[SoundsLikeMapping],
    ) -> ReplacementResult {
        let mut acc = ReplacementResult::unchanged(text);
        for mapping in mappings {
            let step = self.apply_single_replacement(&acc.text, mapping);
            if step.count == 0 {
                continue;
            }
            acc.text = step.text;
            acc.count += step.count;
            acc.occurrences.extend(step.occurrences);
            acc.applied_mappings.extend(step.applied_mappings);
        }
        acc
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
