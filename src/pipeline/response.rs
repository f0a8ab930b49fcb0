//! Completion parsing: raw model text → score + analysis text.
//!
//! The model is asked for a `SCORE: <n>` line followed by an `ANALYSE:`
//! section. Models do not always comply, so parsing never fails: a missing
//! or unreadable score becomes `0.0` and is reported through
//! [`ScoreStatus`] plus a `warn!` on the `cv_analyzer::score` target, so
//! operators can tell "scored zero" from "could not score".
//!
//! Analysis text stored by the calling application goes into a datastore
//! with a fixed-width locale; typographic quotes are folded to ASCII by
//! [`normalize_quotes`] before the text leaves the crate.

use crate::prompts::SCORE_TOKEN;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the score of a result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    /// Read from the `SCORE:` line.
    Parsed,
    /// No line carried the `SCORE:` token.
    Missing,
    /// A `SCORE:` line was present but held no usable number.
    Unparseable,
    /// No completion was obtained (unreadable CV or service failure).
    NotScored,
}

/// A completion split into its score and analysis text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompletion {
    pub score: f64,
    pub status: ScoreStatus,
    pub analysis: String,
}

/// Digits at the start of the score value. Only whitespace and markdown or
/// bracket decoration may precede them, so `N/A (out of 100)` and `-5` are
/// not read as scores.
static RE_SCORE_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s*_\[(]*([0-9]+)").unwrap());

/// Split a completion into score and analysis.
///
/// The first line containing `SCORE:` is the score line; the integer that
/// opens the value after the token is the score, clamped to 0–100. The analysis is
/// the completion without that line, trimmed.
pub fn parse_completion(completion: &str) -> ParsedCompletion {
    let completion = completion.trim();

    let Some((line_no, line)) = completion
        .lines()
        .enumerate()
        .find(|(_, l)| l.contains(SCORE_TOKEN))
    else {
        warn!(
            target: "cv_analyzer::score",
            "completion has no {} line; defaulting score to 0", SCORE_TOKEN
        );
        return ParsedCompletion {
            score: 0.0,
            status: ScoreStatus::Missing,
            analysis: completion.to_string(),
        };
    };

    let analysis = completion
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != line_no)
        .map(|(_, l)| l)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    let (score, status) = match read_score(line) {
        Some(score) => (score, ScoreStatus::Parsed),
        None => {
            warn!(
                target: "cv_analyzer::score",
                "unparseable score line {:?}; defaulting score to 0", line.trim()
            );
            (0.0, ScoreStatus::Unparseable)
        }
    };

    ParsedCompletion {
        score,
        status,
        analysis,
    }
}

fn read_score(line: &str) -> Option<f64> {
    let (_, after) = line.split_once(SCORE_TOKEN)?;
    let digits = RE_SCORE_VALUE.captures(after)?.get(1)?;
    let value: u64 = digits.as_str().parse().ok()?;
    Some((value as f64).clamp(0.0, 100.0))
}

/// Replace typographic quotes with their ASCII equivalents.
///
/// U+2018 and U+2019 become `'`; U+201C and U+201D become `"`.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_score_with_trailing_commentary() {
        let parsed = parse_completion("SCORE: 87 (good fit)\n\nANALYSE:\nStrong Rust background.");
        assert_eq!(parsed.score, 87.0);
        assert_eq!(parsed.status, ScoreStatus::Parsed);
        assert_eq!(parsed.analysis, "ANALYSE:\nStrong Rust background.");
    }

    #[test]
    fn score_line_may_be_anywhere() {
        let parsed = parse_completion("Here is my review.\n**SCORE:** 72/100\nANALYSE: ok");
        assert_eq!(parsed.score, 72.0);
        assert_eq!(parsed.analysis, "Here is my review.\nANALYSE: ok");
    }

    #[test]
    fn first_score_line_wins() {
        let parsed = parse_completion("SCORE: 40\nSCORE: 90");
        assert_eq!(parsed.score, 40.0);
        assert_eq!(parsed.analysis, "SCORE: 90");
    }

    #[test]
    fn missing_token_defaults_to_zero() {
        let parsed = parse_completion("  The candidate looks promising.  ");
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.status, ScoreStatus::Missing);
        assert_eq!(parsed.analysis, "The candidate looks promising.");
    }

    #[test]
    fn token_without_digits_is_unparseable() {
        let parsed = parse_completion("SCORE: N/A\nANALYSE: cannot judge");
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.status, ScoreStatus::Unparseable);
    }

    #[test]
    fn digits_before_token_are_ignored() {
        let parsed = parse_completion("Step 1 SCORE: none");
        assert_eq!(parsed.status, ScoreStatus::Unparseable);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(parse_completion("SCORE: 250").score, 100.0);
        assert_eq!(
            parse_completion("SCORE: 99999999999999999999999").status,
            ScoreStatus::Unparseable
        );
    }

    #[test]
    fn refusal_with_trailing_number_is_unparseable() {
        let parsed = parse_completion("SCORE: N/A (out of 100)\nANALYSE: not enough detail");
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.status, ScoreStatus::Unparseable);
    }

    #[test]
    fn negative_score_is_unparseable() {
        let parsed = parse_completion("SCORE: -5");
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.status, ScoreStatus::Unparseable);
    }

    #[test]
    fn bracketed_and_bold_scores_are_read() {
        assert_eq!(parse_completion("SCORE: [85]").score, 85.0);
        assert_eq!(parse_completion("SCORE: **64** / 100").score, 64.0);
        assert_eq!(parse_completion("SCORE: (70)").status, ScoreStatus::Parsed);
    }

    #[test]
    fn fractional_score_keeps_integer_part() {
        assert_eq!(parse_completion("SCORE: 87.5").score, 87.0);
    }

    #[test]
    fn empty_completion() {
        let parsed = parse_completion("");
        assert_eq!(parsed.status, ScoreStatus::Missing);
        assert!(parsed.analysis.is_empty());
    }

    mod score_warnings {
        use super::*;
        use std::sync::{Arc, Mutex};
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        #[derive(Clone, Default)]
        struct Recorder(Arc<Mutex<Vec<(Level, String)>>>);

        impl<S: Subscriber> Layer<S> for Recorder {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                let meta = event.metadata();
                self.0
                    .lock()
                    .unwrap()
                    .push((*meta.level(), meta.target().to_string()));
            }
        }

        /// WARN events on the score target emitted while parsing `completion`.
        fn score_warnings(completion: &str) -> (ScoreStatus, usize) {
            let recorder = Recorder::default();
            let subscriber = tracing_subscriber::registry().with(recorder.clone());
            let status = tracing::subscriber::with_default(subscriber, || {
                parse_completion(completion).status
            });
            let count = recorder
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|(level, target)| *level == Level::WARN && target == "cv_analyzer::score")
                .count();
            (status, count)
        }

        #[test]
        fn missing_score_warns_once() {
            assert_eq!(score_warnings("No number here."), (ScoreStatus::Missing, 1));
        }

        #[test]
        fn unparseable_score_warns_once() {
            assert_eq!(score_warnings("SCORE: N/A"), (ScoreStatus::Unparseable, 1));
        }

        #[test]
        fn parsed_score_is_silent() {
            assert_eq!(score_warnings("SCORE: 80\nANALYSE: fine"), (ScoreStatus::Parsed, 0));
        }
    }

    #[test]
    fn normalizes_typographic_quotes() {
        let out = normalize_quotes("The candidate\u{2019}s \u{201C}leadership\u{201D} \u{2018}skills\u{2019}");
        assert_eq!(out, "The candidate's \"leadership\" 'skills'");
        assert!(!out.contains('\u{2019}'));
    }

    #[test]
    fn normalize_leaves_other_text_alone() {
        assert_eq!(normalize_quotes("Expérience: 5 ans — «bien»"), "Expérience: 5 ans — «bien»");
    }
}
