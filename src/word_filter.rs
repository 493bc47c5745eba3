//! Profanity censoring for chat messages.
//!
//! Listed words are matched case-insensitively as whole words and replaced
//! with a fixed mask. Words embedded in longer words ("scunthorpe") are left
//! alone.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::sync::RwLock;

/// Replacement for every censored word, whatever its length.
pub const CENSOR_MASK: &str = "****";

/// Used when the configuration does not name its own list.
pub const DEFAULT_CENSOR_WORDS: &[&str] = &[
    "arse",
    "arsehole",
    "bastard",
    "bollocks",
    "bugger",
    "bullshit",
    "crap",
    "cunt",
    "damn",
    "dick",
    "fuck",
    "fucking",
    "piss",
    "prick",
    "shit",
    "twat",
    "wanker",
];

/// A compiled censor list.
#[derive(Debug, Default)]
pub struct WordFilter {
    regex: Option<Regex>,
    words: usize,
}

impl WordFilter {
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Self::default();
        }

        let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        match Regex::new(&pattern) {
            Ok(regex) => Self {
                regex: Some(regex),
                words: alternatives.len(),
            },
            Err(e) => {
                log::error!("Failed to compile censor list: {}", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    pub fn contains_profanity(&self, text: &str) -> bool {
        self.regex.as_ref().map_or(false, |r| r.is_match(text))
    }

    pub fn censor(&self, text: &str) -> String {
        match &self.regex {
            Some(regex) => regex.replace_all(text, CENSOR_MASK).into_owned(),
            None => text.to_owned(),
        }
    }
}

/// Global filter used by the chat relay.
static FILTER: OnceCell<RwLock<WordFilter>> = OnceCell::new();

/// Compiles `words` into the global filter, replacing any previous list.
pub fn init_filters<S: AsRef<str>>(words: &[S]) {
    let compiled = WordFilter::new(words);
    log::info!("Loaded {} censored words", compiled.len());

    let cache = FILTER.get_or_init(|| RwLock::new(WordFilter::default()));
    match cache.write() {
        Ok(mut filter) => *filter = compiled,
        Err(e) => log::error!("Censor list lock poisoned: {}", e),
    }
}

/// Censors with the global filter. Text passes unchanged before `init_filters`.
pub fn censor(text: &str) -> String {
    let cache = match FILTER.get() {
        Some(c) => c,
        None => return text.to_owned(),
    };

    match cache.read() {
        Ok(filter) => filter.censor(text),
        Err(_) => text.to_owned(),
    }
}
