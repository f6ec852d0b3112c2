//! Business-signal extraction from page text
//!
//! Lexicon terms are matched case-insensitively on word boundaries. Partner and
//! client *names* are pulled with two capture patterns that look for a
//! capitalised phrase right after "partner(s|ship) (with)" or "clients (include)".

use crate::config::Lexicon;
use crate::ConfigError;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

const PARTNER_NAME_PATTERN: &str =
    r"(?:partner(?:s|ship)?(?: with)?[:\-]?\s*)([A-Z][A-Za-z0-9&\.\- ]{2,80})";
const CLIENT_NAME_PATTERN: &str =
    r"(?:clients include[:\-]?\s*|clients[:\-]?\s*)([A-Z][A-Za-z0-9,&\.\- ]{2,120})";

/// Upper bound on captured names per page
const MAX_NAMES: usize = 20;

/// Keyword evidence found in one page's text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusinessSignals {
    pub niche_terms: Vec<String>,
    pub partner_indicators: Vec<String>,
    pub client_indicators: Vec<String>,
    /// Occurrences per matched niche term or evidence keyword
    pub keyword_hits: BTreeMap<String, usize>,
    pub partner_names: Vec<String>,
    pub client_names: Vec<String>,
}

struct Term {
    term: String,
    pattern: Regex,
}

/// Compiled matcher for one lexicon
pub struct SignalExtractor {
    niche: Vec<Term>,
    partner: Vec<Term>,
    client: Vec<Term>,
    evidence: Vec<Term>,
    partner_names: Regex,
    client_names: Regex,
}

fn compile_terms(terms: &[String]) -> Result<Vec<Term>, ConfigError> {
    terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            let term = t.trim().to_lowercase();
            term_regex(&term).map(|pattern| Term { term, pattern })
        })
        .collect()
}

/// `\b` is only meaningful next to a word character
fn term_regex(term: &str) -> Result<Regex, ConfigError> {
    let is_word = |c: Option<char>| c.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false);
    let start = if is_word(term.chars().next()) { r"\b" } else { "" };
    let end = if is_word(term.chars().last()) { r"\b" } else { "" };

    Regex::new(&format!("(?i){}{}{}", start, regex::escape(term), end))
        .map_err(|e| ConfigError::Validation(format!("bad lexicon term '{}': {}", term, e)))
}

fn matched(terms: &[Term], text: &str) -> Vec<String> {
    terms
        .iter()
        .filter(|t| t.pattern.is_match(text))
        .map(|t| t.term.clone())
        .collect()
}

fn capture_names(pattern: &Regex, text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(text) {
        let Some(m) = caps.get(1) else {
            continue;
        };
        // The character class spans sentences; keep the first one
        let first_sentence = m.as_str().split(". ").next().unwrap_or_default();
        let name = first_sentence
            .trim()
            .trim_end_matches(['.', ',', '-'])
            .trim()
            .to_string();
        if name.len() >= 3 && !names.contains(&name) {
            names.push(name);
        }
        if names.len() >= MAX_NAMES {
            break;
        }
    }
    names
}

impl SignalExtractor {
    /// Compiles every lexicon list
    pub fn new(lexicon: &Lexicon) -> Result<Self, ConfigError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ConfigError::Validation(e.to_string()))
        };

        Ok(Self {
            niche: compile_terms(&lexicon.niche_terms)?,
            partner: compile_terms(&lexicon.partner_indicators)?,
            client: compile_terms(&lexicon.client_indicators)?,
            evidence: compile_terms(&lexicon.evidence_keywords)?,
            partner_names: compile(PARTNER_NAME_PATTERN)?,
            client_names: compile(CLIENT_NAME_PATTERN)?,
        })
    }

    /// Extracts signals from page text
    ///
    /// Deterministic: the same text and lexicon always give the same result.
    pub fn extract(&self, text: &str) -> BusinessSignals {
        if text.trim().is_empty() {
            return BusinessSignals::default();
        }

        let mut keyword_hits = BTreeMap::new();
        for term in self.niche.iter().chain(self.evidence.iter()) {
            let count = term.pattern.find_iter(text).count();
            if count > 0 {
                *keyword_hits.entry(term.term.clone()).or_insert(0) += count;
            }
        }

        BusinessSignals {
            niche_terms: matched(&self.niche, text),
            partner_indicators: matched(&self.partner, text),
            client_indicators: matched(&self.client, text),
            keyword_hits,
            partner_names: capture_names(&self.partner_names, text),
            client_names: capture_names(&self.client_names, text),
        }
    }
}
