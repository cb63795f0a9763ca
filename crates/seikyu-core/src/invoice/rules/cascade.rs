//! Prioritized rule lists shared by every scalar field extractor.
//!
//! A [`Cascade`] holds rules ordered from most to least specific. Labeled
//! patterns (value preceded by an explicit label such as `請求書番号:`) come
//! first with high confidence, unlabeled heuristics last. The first candidate
//! that passes its rule's validator wins.

use std::fmt;

use regex::Regex;
use tracing::{debug, trace};

use super::{ExtractionMatch, FieldExtractor};

type Finder = Box<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// How a rule finds candidate values in the text.
enum Matcher {
    /// A capture group of a regex, tried at every match position.
    Pattern { regex: &'static Regex, group: usize },
    /// Structural search over the text, e.g. an [`AnchorScan`].
    Finder(Finder),
}

/// One entry of a cascade: a matcher, its confidence and a validator.
///
/// The validator both checks and normalizes the raw candidate; returning
/// `None` rejects the candidate and the search moves on.
pub struct Rule<T> {
    matcher: Matcher,
    confidence: f32,
    validate: fn(&str) -> Option<T>,
}

impl<T> Rule<T> {
    /// Rule reading capture group 1 of `regex`.
    pub fn pattern(regex: &'static Regex, confidence: f32, validate: fn(&str) -> Option<T>) -> Self {
        Self::pattern_group(regex, 1, confidence, validate)
    }

    /// Rule reading capture group `group` of `regex`.
    pub fn pattern_group(
        regex: &'static Regex,
        group: usize,
        confidence: f32,
        validate: fn(&str) -> Option<T>,
    ) -> Self {
        Self {
            matcher: Matcher::Pattern { regex, group },
            confidence,
            validate,
        }
    }

    /// Rule whose candidates come from an arbitrary search function.
    pub fn finder(
        find: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
        confidence: f32,
        validate: fn(&str) -> Option<T>,
    ) -> Self {
        Self {
            matcher: Matcher::Finder(Box::new(find)),
            confidence,
            validate,
        }
    }

    fn matches(&self, text: &str) -> Vec<ExtractionMatch<T>> {
        let mut results = Vec::new();

        match &self.matcher {
            Matcher::Pattern { regex, group } => {
                for caps in regex.captures_iter(text) {
                    let Some(candidate) = caps.get(*group) else {
                        continue;
                    };
                    if let Some(value) = (self.validate)(candidate.as_str()) {
                        results.push(
                            ExtractionMatch::new(value, self.confidence, candidate.as_str())
                                .with_position(candidate.start(), candidate.end()),
                        );
                    }
                }
            }
            Matcher::Finder(find) => {
                for candidate in find(text) {
                    if let Some(value) = (self.validate)(&candidate) {
                        results.push(ExtractionMatch::new(value, self.confidence, candidate));
                    }
                }
            }
        }

        results
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let matcher = match &self.matcher {
            Matcher::Pattern { regex, group } => format!("{}#{}", regex.as_str(), group),
            Matcher::Finder(_) => "<finder>".to_string(),
        };
        f.debug_struct("Rule")
            .field("matcher", &matcher)
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Ordered rule list evaluated with "first match wins".
#[derive(Debug)]
pub struct Cascade<T> {
    field: &'static str,
    rules: Vec<Rule<T>>,
}

impl<T> Cascade<T> {
    /// Create an empty cascade for the named field.
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            rules: Vec::new(),
        }
    }

    /// Append a rule (lower priority than every rule before it).
    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Name of the field this cascade extracts.
    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl<T> FieldExtractor for Cascade<T> {
    type Output = ExtractionMatch<T>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(found) = rule.matches(text).into_iter().next() {
                debug!(
                    field = self.field,
                    rule = index,
                    confidence = found.confidence,
                    "field extracted"
                );
                return Some(found);
            }
        }

        trace!(field = self.field, "no rule matched");
        None
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.rules.iter().flat_map(|rule| rule.matches(text)).collect()
    }
}

/// A line chosen by an [`AnchorScan`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorHit {
    /// Index of the anchor line.
    pub anchor_index: usize,
    /// Index of the chosen line (equal to `anchor_index` when the value
    /// follows the keyword on the anchor line itself).
    pub index: usize,
    /// The chosen text, trimmed.
    pub line: String,
    /// Whether the line satisfied the preference predicate.
    pub preferred: bool,
}

/// Locate a keyword line and pick a value from a bounded window after it.
///
/// Candidates are the remainder of the anchor line after the keyword, then
/// up to `lookahead` following lines. Among candidates passing `accept`, the
/// first one also passing `prefer` wins; otherwise the first accepted one.
pub struct AnchorScan {
    anchor: &'static str,
    lookahead: usize,
    accept: fn(&str) -> bool,
    prefer: fn(&str) -> bool,
}

impl AnchorScan {
    pub fn new(anchor: &'static str, lookahead: usize) -> Self {
        Self {
            anchor,
            lookahead,
            accept: |line| !line.trim().is_empty(),
            prefer: |_| false,
        }
    }

    /// Set the line-acceptance predicate.
    pub fn accept(mut self, accept: fn(&str) -> bool) -> Self {
        self.accept = accept;
        self
    }

    /// Set the predicate that ranks an accepted line above the others.
    pub fn prefer(mut self, prefer: fn(&str) -> bool) -> Self {
        self.prefer = prefer;
        self
    }

    /// Index of the first line containing the anchor keyword.
    pub fn find_anchor<S: AsRef<str>>(&self, lines: &[S]) -> Option<usize> {
        lines.iter().position(|l| l.as_ref().contains(self.anchor))
    }

    /// Run the scan over `lines`.
    pub fn scan<S: AsRef<str>>(&self, lines: &[S]) -> Option<AnchorHit> {
        let anchor_index = self.find_anchor(lines)?;
        let anchor_line = lines[anchor_index].as_ref();

        let remainder = anchor_line
            .split_once(self.anchor)
            .map(|(_, rest)| rest)
            .unwrap_or("")
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '：' | '】' | ']'));

        let mut candidates = vec![(anchor_index, remainder.trim())];
        candidates.extend(
            lines
                .iter()
                .enumerate()
                .skip(anchor_index + 1)
                .take(self.lookahead)
                .map(|(i, l)| (i, l.as_ref().trim())),
        );

        let accepted: Vec<(usize, &str)> = candidates
            .into_iter()
            .filter(|(_, line)| !line.is_empty() && (self.accept)(line))
            .collect();

        let (index, line, preferred) = accepted
            .iter()
            .find(|(_, line)| (self.prefer)(line))
            .map(|&(i, l)| (i, l, true))
            .or_else(|| accepted.first().map(|&(i, l)| (i, l, false)))?;

        Some(AnchorHit {
            anchor_index,
            index,
            line: line.to_string(),
            preferred,
        })
    }
}

impl fmt::Debug for AnchorScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorScan")
            .field("anchor", &self.anchor)
            .field("lookahead", &self.lookahead)
            .finish()
    }
}
