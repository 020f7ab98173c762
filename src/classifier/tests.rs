use super::*;

#[test]
fn test_classify_is_deterministic() {
    let query = "What's the weather in NYC today?";

    assert_eq!(classify(query), classify(query));
}

#[test]
fn test_classify_is_lowercase_stable() {
    let queries = [
        "What's the WEATHER in NYC Today?",
        "Who Was The First person on the moon?",
        "LATEST Bitcoin price",
    ];

    for query in queries {
        assert_eq!(classify(query), classify(&query.to_lowercase()));
    }
}

#[test]
fn test_temporal_words_are_time_sensitive() {
    let queries = [
        "What's the weather in NYC today?",
        "latest bitcoin price",
        "who won the game tonight",
        "breaking headlines this week",
    ];

    for query in queries {
        assert_eq!(classify(query).class, QueryClass::TimeSensitive, "{query}");
    }
}

#[test]
fn test_no_temporal_words_is_evergreen() {
    let queries = [
        "How do I make pasta?",
        "Explain photosynthesis",
        "What is the capital of France?",
    ];

    for query in queries {
        assert_eq!(classify(query).class, QueryClass::Evergreen, "{query}");
    }
}

#[test]
fn test_evergreen_markers_override_temporal_lexicon() {
    // Fact-style queries whose words overlap the time-sensitive lexicon.
    let queries = [
        "What year did the stock market crash?",
        "Who was the first player to score 100 points in a game?",
        "History of weather forecasting",
    ];

    for query in queries {
        assert_eq!(classify(query).class, QueryClass::Evergreen, "{query}");
    }
}

#[test]
fn test_caching_params_fixed_table() {
    assert_eq!(
        QueryClass::TimeSensitive.caching_params(),
        (TIME_SENSITIVE_THRESHOLD, TIME_SENSITIVE_TTL_SECS)
    );
    assert_eq!(
        QueryClass::Evergreen.caching_params(),
        (EVERGREEN_THRESHOLD, EVERGREEN_TTL_SECS)
    );

    let time_sensitive = classify("latest bitcoin price");
    assert_eq!(time_sensitive.threshold, 0.15);
    assert_eq!(time_sensitive.ttl_seconds, 300);

    let evergreen = classify("Explain photosynthesis");
    assert_eq!(evergreen.threshold, 0.30);
    assert_eq!(evergreen.ttl_seconds, 604_800);
}

#[test]
fn test_topic_selection() {
    let cases = [
        ("What is the capital of France?", Topic::Geography),
        ("What's the weather forecast for tomorrow?", Topic::Weather),
        ("Explain quantum physics experiments", Topic::Science),
        ("Best javascript framework for an api", Topic::Technology),
        ("Who was the king during the revolution?", Topic::History),
        ("Explain photosynthesis", Topic::General),
    ];

    for (query, expected) in cases {
        assert_eq!(classify(query).topic, expected, "{query}");
    }
}

#[test]
fn test_topic_tie_yields_general() {
    // One weather anchor and one science anchor apiece.
    assert_eq!(classify("rain gravity").topic, Topic::General);
}

#[test]
fn test_topic_requires_strict_winner() {
    // Two weather anchors beat one finance anchor.
    assert_eq!(
        classify("will rain affect the humidity index").topic,
        Topic::Weather
    );
}

#[test]
fn test_word_boundaries_prevent_substring_matches() {
    // "javascript" must not count as "java", "nowhere" not as "now".
    assert_eq!(classify("nowhere to be found").class, QueryClass::Evergreen);

    let topic_scores = classify("tips for learning javascript");
    assert_eq!(topic_scores.topic, Topic::Technology);
}

#[test]
fn test_single_character_query() {
    let classification = classify("a");

    assert_eq!(classification.class, QueryClass::Evergreen);
    assert_eq!(classification.topic, Topic::General);
}

#[test]
fn test_topic_from_tag_normalizes_unknown() {
    assert_eq!(Topic::from_tag("weather"), Topic::Weather);
    assert_eq!(Topic::from_tag("geography"), Topic::Geography);
    assert_eq!(Topic::from_tag("astrology"), Topic::General);
    assert_eq!(Topic::from_tag(""), Topic::General);
}

#[test]
fn test_query_class_from_tag() {
    assert_eq!(QueryClass::from_tag("time_sensitive"), QueryClass::TimeSensitive);
    assert_eq!(QueryClass::from_tag("evergreen"), QueryClass::Evergreen);
    assert_eq!(QueryClass::from_tag("unknown"), QueryClass::Evergreen);
}

#[test]
fn test_wire_names_round_trip() {
    for topic in Topic::ALL {
        assert_eq!(Topic::from_tag(topic.as_str()), topic);
    }
    assert_eq!(QueryClass::TimeSensitive.as_str(), "time_sensitive");
    assert_eq!(QueryClass::Evergreen.as_str(), "evergreen");
}
