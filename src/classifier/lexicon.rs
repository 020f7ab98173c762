//! Compiled lexicons for the freshness and topic stages.
//!
//! All anchors are matched against already-lowercased text, word-boundaried
//! where the anchor is a word. The closed topic set and its anchors are part
//! of the external contract: they determine which partition a query lands in
//! and therefore observable hit behavior.

use std::sync::LazyLock;

use regex::RegexSet;

use super::Topic;

/// Markers that force the evergreen class regardless of the time-sensitive
/// lexicon.
pub(super) static EVERGREEN_MARKERS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"who was the first",
        r"what year did",
        r"definition of",
        r"what is a\b",
        r"how do you",
        r"history of",
    ])
    .expect("evergreen markers compile")
});

/// Temporal lexicon; one or more matches classify a query as
/// time-sensitive.
pub(super) static TIME_SENSITIVE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\btoday\b",
        r"\bnow\b",
        r"\bcurrent(ly)?\b",
        r"\blatest\b",
        r"\brecent(ly)?\b",
        r"\byesterday\b",
        r"\btomorrow\b",
        r"\bthis week\b",
        r"\btonight\b",
        r"\bweather\b",
        r"\bforecast\b",
        r"\btemperature\b",
        r"\bnews\b",
        r"\bheadlines?\b",
        r"\bbreaking\b",
        r"\bstock\b",
        r"\bprice\b",
        r"\bmarket\b",
        r"\btrading\b",
        r"\bbitcoin\b",
        r"\bscore\b",
        r"\bgame\b",
        r"\bmatch\b",
        r"\bwon\b",
        r"\blost\b",
    ])
    .expect("time-sensitive lexicon compiles")
});

static TOPIC_LEXICONS: LazyLock<Vec<(Topic, RegexSet)>> = LazyLock::new(|| {
    // Declaration order is the documented scoring order.
    vec![
        (
            Topic::Weather,
            anchors(&[
                "weather",
                "forecast",
                "temperature",
                "rain",
                "sunny",
                "cloudy",
                "snow",
                "humidity",
                "climate",
            ]),
        ),
        (
            Topic::Finance,
            anchors(&[
                "stock",
                "price",
                "market",
                "trading",
                "bitcoin",
                "crypto",
                "invest",
                "dividend",
                "shares",
                "portfolio",
                "index",
                "nasdaq",
                "s&p",
            ]),
        ),
        (
            Topic::Sports,
            anchors(&[
                "score",
                "game",
                "match",
                "team",
                "player",
                "won",
                "lost",
                "championship",
                "league",
                "tournament",
                "football",
                "basketball",
                "soccer",
                "tennis",
                "olympic",
            ]),
        ),
        (
            Topic::Technology,
            anchors(&[
                "programming",
                "software",
                "code",
                "computer",
                "algorithm",
                "database",
                "api",
                "python",
                "javascript",
                "java",
                "rust",
                "machine learning",
                "ai",
                "artificial intelligence",
                "neural",
                "deep learning",
                "framework",
                "library",
            ]),
        ),
        (
            Topic::Science,
            anchors(&[
                "physics",
                "chemistry",
                "biology",
                "math",
                "science",
                "atom",
                "molecule",
                "cell",
                "dna",
                "evolution",
                "theory",
                "experiment",
                "quantum",
                "relativity",
                "gravity",
            ]),
        ),
        (
            Topic::History,
            anchors(&[
                "history",
                "historical",
                "war",
                "century",
                "ancient",
                "empire",
                "king",
                "queen",
                "president",
                "revolution",
                "civilization",
                "colonial",
                "medieval",
            ]),
        ),
        (
            Topic::Geography,
            anchors(&[
                "capital",
                "country",
                "city",
                "continent",
                "ocean",
                "mountain",
                "river",
                "island",
                "population",
                "geography",
                "location",
                "region",
            ]),
        ),
        (
            Topic::News,
            anchors(&[
                "news",
                "headlines?",
                "breaking",
                "report",
                "announce",
                "election",
                "politics",
                "government",
            ]),
        ),
    ]
});

/// Topic lexicons in declaration order.
pub(super) fn topic_lexicons() -> impl Iterator<Item = &'static (Topic, RegexSet)> {
    TOPIC_LEXICONS.iter()
}

fn anchors(words: &[&str]) -> RegexSet {
    let patterns: Vec<String> = words.iter().map(|w| format!(r"\b{w}\b")).collect();
    RegexSet::new(&patterns).expect("topic lexicon compiles")
}
