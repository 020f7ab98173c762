//! Query classification (freshness class + topic partition).
//!
//! This module is the only place caching policy lives: it maps query text
//! to a freshness class, a topic partition, and the class's
//! `(threshold, ttl)` pair. Everything downstream is policy-free.

mod lexicon;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

/// Cosine-distance threshold for time-sensitive matches.
pub const TIME_SENSITIVE_THRESHOLD: f32 = 0.15;
/// TTL for time-sensitive entries (5 minutes).
pub const TIME_SENSITIVE_TTL_SECS: u64 = 300;
/// Cosine-distance threshold for evergreen matches.
pub const EVERGREEN_THRESHOLD: f32 = 0.30;
/// TTL for evergreen entries (7 days).
pub const EVERGREEN_TTL_SECS: u64 = 604_800;

/// Freshness category of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryClass {
    /// The correct answer changes on the order of minutes; strict matching,
    /// short TTL.
    TimeSensitive,
    /// The answer is stable; relaxed matching, week-long TTL.
    Evergreen,
}

impl QueryClass {
    /// Wire name of the class.
    pub fn as_str(self) -> &'static str {
        match self {
            QueryClass::TimeSensitive => "time_sensitive",
            QueryClass::Evergreen => "evergreen",
        }
    }

    /// Parses a stored class tag. Unknown tags fall back to the relaxed
    /// evergreen policy.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "time_sensitive" => QueryClass::TimeSensitive,
            _ => QueryClass::Evergreen,
        }
    }

    /// The fixed `(threshold, ttl_seconds)` pair for this class.
    pub fn caching_params(self) -> (f32, u64) {
        match self {
            QueryClass::TimeSensitive => (TIME_SENSITIVE_THRESHOLD, TIME_SENSITIVE_TTL_SECS),
            QueryClass::Evergreen => (EVERGREEN_THRESHOLD, EVERGREEN_TTL_SECS),
        }
    }
}

impl std::fmt::Display for QueryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache partition tag derived from a lexicon scan.
///
/// The set is closed; unknown tags normalize to [`Topic::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Topic {
    Weather,
    Finance,
    Sports,
    Technology,
    Science,
    History,
    Geography,
    News,
    General,
}

impl Topic {
    /// All topics in declaration order. This order is the documented
    /// iteration order for topic scoring.
    pub const ALL: [Topic; 9] = [
        Topic::Weather,
        Topic::Finance,
        Topic::Sports,
        Topic::Technology,
        Topic::Science,
        Topic::History,
        Topic::Geography,
        Topic::News,
        Topic::General,
    ];

    /// Wire name of the topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Weather => "weather",
            Topic::Finance => "finance",
            Topic::Sports => "sports",
            Topic::Technology => "technology",
            Topic::Science => "science",
            Topic::History => "history",
            Topic::Geography => "geography",
            Topic::News => "news",
            Topic::General => "general",
        }
    }

    /// Parses a stored topic tag; unknown tags normalize to `General`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "weather" => Topic::Weather,
            "finance" => Topic::Finance,
            "sports" => Topic::Sports,
            "technology" => Topic::Technology,
            "science" => Topic::Science,
            "history" => Topic::History,
            "geography" => Topic::Geography,
            "news" => Topic::News,
            _ => Topic::General,
        }
    }

    /// Whether this topic names a real partition (everything but `General`).
    pub fn is_specific(self) -> bool {
        self != Topic::General
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable classification produced once per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Freshness class.
    pub class: QueryClass,
    /// Topic partition.
    pub topic: Topic,
    /// Maximum admissible cosine distance for a match.
    pub threshold: f32,
    /// Expiration horizon for a newly-stored entry.
    pub ttl_seconds: u64,
}

/// Classifies a query. Pure and deterministic; no I/O.
///
/// The text is lower-cased once, then two independent stages run: the
/// freshness stage (evergreen markers override the time-sensitive lexicon,
/// catching fact-style queries whose words overlap it) and the topic stage
/// (per-topic lexicon scores, strictly-highest wins).
pub fn classify(query: &str) -> Classification {
    let lowered = query.to_lowercase();

    let class = classify_class(&lowered);
    let topic = classify_topic(&lowered);
    let (threshold, ttl_seconds) = class.caching_params();

    Classification {
        class,
        topic,
        threshold,
        ttl_seconds,
    }
}

fn classify_class(lowered: &str) -> QueryClass {
    if lexicon::EVERGREEN_MARKERS.is_match(lowered) {
        return QueryClass::Evergreen;
    }

    let time_matches = lexicon::TIME_SENSITIVE.matches(lowered).iter().count();
    if time_matches >= 1 {
        QueryClass::TimeSensitive
    } else {
        QueryClass::Evergreen
    }
}

/// Scores each topic lexicon against the lowered text in declaration order.
/// A topic wins only with a strictly highest score; a tie for the maximum
/// (or no match at all) yields `General`.
fn classify_topic(lowered: &str) -> Topic {
    let mut best = Topic::General;
    let mut best_score = 0usize;
    let mut tied = false;

    for (topic, set) in lexicon::topic_lexicons() {
        let score = set.matches(lowered).iter().count();
        if score > best_score {
            best = *topic;
            best_score = score;
            tied = false;
        } else if score > 0 && score == best_score {
            tied = true;
        }
    }

    if best_score == 0 || tied {
        Topic::General
    } else {
        best
    }
}
