//! Heuristic clause segmentation.
//!
//! Paragraphs separated by blank lines are the primary clause boundary. Long
//! paragraphs are re-split into sentences, and when the paragraph pass finds
//! too few clauses the whole text is split by sentence instead.

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::models::Clause;

/// Prefixes of preamble/boilerplate paragraphs skipped by the paragraph pass.
const PARAGRAPH_SKIP_PREFIXES: [&str; 5] = ["whereas", "this agreement", "the parties", "page ", "exhibit"];

/// Prefixes skipped by the sentence fallback.
const SENTENCE_SKIP_PREFIXES: [&str; 3] = ["whereas", "this agreement", "the parties"];

/// Tunable limits for [`Segmenter`]. All lengths are in characters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Units must be strictly longer than this to count as a clause.
    pub min_clause_chars: usize,
    /// Paragraphs longer than this are re-split into sentences.
    pub long_paragraph_chars: usize,
    /// The paragraph pass must yield at least this many clauses, else the
    /// sentence fallback is used.
    pub min_clauses: usize,
    /// Length of the display preview stored on each clause.
    pub preview_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_clause_chars: 50,
            long_paragraph_chars: 500,
            min_clauses: 5,
            preview_chars: 200,
        }
    }
}

pub struct Segmenter {
    config: SegmenterConfig,
    paragraph_break: Regex,
    numbered_header: Regex,
    sentence_break: Regex,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        Ok(Self {
            config,
            paragraph_break: Regex::new(r"\r?\n[ \t]*\r?\n")?,
            numbered_header: Regex::new(r"^\d+[\.\)]\s*$")?,
            // A period followed by whitespace and an uppercase letter.
            sentence_break: Regex::new(r"\.\s+[A-Z]")?,
        })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split `text` into ordered clauses numbered from 1.
    pub fn segment(&self, text: &str) -> Vec<Clause> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut units = self.paragraph_pass(text);

        if units.len() < self.config.min_clauses {
            let fallback = self.sentence_pass(text);
            debug!(
                paragraph_clauses = units.len(),
                sentence_clauses = fallback.len(),
                "paragraph pass below floor, using sentence fallback"
            );
            // An empty fallback would throw away clauses the paragraph pass found.
            if !fallback.is_empty() {
                units = fallback;
            }
        }

        units
            .into_iter()
            .enumerate()
            .map(|(i, unit)| Clause::new(i + 1, unit, self.config.preview_chars))
            .collect()
    }

    fn paragraph_pass(&self, text: &str) -> Vec<String> {
        let mut clauses = Vec::new();

        for raw in self.paragraph_break.split(text) {
            let paragraph = normalize_newlines(raw.trim());

            if paragraph.chars().count() <= self.config.min_clause_chars
                || has_prefix(&paragraph, &PARAGRAPH_SKIP_PREFIXES)
                || self.numbered_header.is_match(&paragraph)
            {
                continue;
            }

            if paragraph.chars().count() > self.config.long_paragraph_chars {
                for sentence in self.split_sentences(&paragraph) {
                    let sentence = sentence.trim();
                    if sentence.chars().count() > self.config.min_clause_chars {
                        clauses.push(with_period(sentence));
                    }
                }
            } else {
                clauses.push(paragraph);
            }
        }

        clauses
    }

    fn sentence_pass(&self, text: &str) -> Vec<String> {
        self.split_sentences(text)
            .into_iter()
            .map(|s| normalize_newlines(s.trim()))
            .filter(|s| {
                s.chars().count() > self.config.min_clause_chars
                    && !has_prefix(s, &SENTENCE_SKIP_PREFIXES)
            })
            .map(|s| with_period(&s))
            .collect()
    }

    /// Split at every period that is followed by whitespace and an uppercase
    /// letter. The period itself is dropped; the rest stays with the next piece.
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for m in self.sentence_break.find_iter(text) {
            pieces.push(&text[start..m.start()]);
            start = m.start() + 1;
        }
        pieces.push(&text[start..]);
        pieces
    }
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn has_prefix(s: &str, prefixes: &[&str]) -> bool {
    let lower = s.to_lowercase();
    prefixes.iter().any(|p| lower.starts_with(p))
}

fn with_period(s: &str) -> String {
    if s.ends_with('.') {
        s.to_string()
    } else {
        format!("{s}.")
    }
}
