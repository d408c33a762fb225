//! Profanity lexicon with whole-token matching

use modscan_core::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Terms used when no lexicon is configured
const BUILTIN_TERMS: &[&str] = &[
    "arse", "arsehole", "asshole", "bastard", "bitch", "bollocks", "bullshit", "crap", "cunt",
    "damn", "dick", "dickhead", "fuck", "fucking", "motherfucker", "piss", "prick", "shit",
    "slut", "twat", "wanker", "whore",
];

/// Static set of offensive terms.
///
/// Text is lowercased and split into word tokens; a token matches only when
/// it equals a term exactly, so "scrap" never matches "crap".
pub struct ProfanityLexicon {
    terms: HashSet<String>,
    tokenizer: Regex,
}

impl ProfanityLexicon {
    /// Create a lexicon from the given terms
    pub fn new<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenizer = Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}\p{N}]+)*")
            .map_err(|e| Error::config(format!("Failed to build tokenizer: {}", e)))?;

        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self { terms, tokenizer })
    }

    /// The built-in English lexicon
    pub fn builtin() -> Result<Self> {
        Self::new(BUILTIN_TERMS)
    }

    /// Load a newline-delimited term list
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(read_terms(path)?)
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `token` is a term, after lowercasing
    pub fn contains(&self, token: &str) -> bool {
        self.terms.contains(&token.to_lowercase())
    }

    /// Every matching token in `text`, in order, duplicates kept
    pub fn matches(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.tokenizer
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| self.terms.contains(*token))
            .map(str::to_string)
            .collect()
    }

    /// Matches across several text fragments, fragment order preserved
    pub fn matches_all<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        texts
            .into_iter()
            .flat_map(|text| self.matches(text))
            .collect()
    }
}

/// Read a newline-delimited term list; blank lines and `#` comments are skipped
pub fn read_terms(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read lexicon {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
