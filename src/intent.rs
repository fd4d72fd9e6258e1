//! Intent corpus and nearest-phrase response lookup.
//!
//! The corpus is a JSON array of intents:
//!
//! ```json
//! [
//!   { "utterances": [["how", "are", "you"], ["how", "is", "it", "going"]],
//!     "responses": ["I'm fine, thanks!", "All good here."] }
//! ]
//! ```
//!
//! Each utterance's tokens are joined with single spaces into a candidate
//! phrase. Input matches a candidate when their Levenshtein distance is less
//! than half the candidate's length; the closest match wins and one of its
//! responses is picked at random.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("intent #{index} has no responses")]
    NoResponses { index: usize },
}

#[derive(Debug, Clone, Deserialize)]
struct RawIntent {
    #[serde(default)]
    utterances: Vec<Vec<String>>,
    responses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    candidates: Vec<String>,
    responses: Vec<String>,
}

impl Intent {
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn responses(&self) -> &[String] {
        &self.responses
    }
}

/// Closest accepted candidate for an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentMatch<'a> {
    pub intent: usize,
    pub candidate: &'a str,
    pub distance: usize,
}

/// Read-only after load; share it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    intents: Vec<Intent>,
}

impl Corpus {
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let text = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, CorpusError> {
        let raw: Vec<RawIntent> = serde_json::from_str(text)?;
        let intents = raw
            .into_iter()
            .enumerate()
            .map(|(index, intent)| {
                if intent.responses.is_empty() {
                    return Err(CorpusError::NoResponses { index });
                }
                Ok(Intent {
                    candidates: intent
                        .utterances
                        .iter()
                        .map(|tokens| join_tokens(tokens))
                        .collect(),
                    responses: intent.responses,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { intents })
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Smallest-distance candidate under its acceptance bound. Ties go to
    /// the earliest candidate in corpus order.
    pub fn best_match(&self, input: &str) -> Option<IntentMatch<'_>> {
        let mut best: Option<IntentMatch<'_>> = None;
        for (index, intent) in self.intents.iter().enumerate() {
            for candidate in &intent.candidates {
                let distance = strsim::levenshtein(input, candidate);
                let bound = candidate.chars().count() / 2;
                if distance >= bound {
                    continue;
                }
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(IntentMatch {
                        intent: index,
                        candidate,
                        distance,
                    });
                }
            }
        }
        best
    }

    /// A random response from the best-matching intent, if any matched.
    pub fn respond<R: Rng + ?Sized>(&self, input: &str, rng: &mut R) -> Option<&str> {
        let found = self.best_match(input)?;
        self.intents[found.intent]
            .responses
            .choose(rng)
            .map(String::as_str)
    }
}

fn join_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CORPUS: &str = r#"[
        { "utterances": [["how", "are", "you"], ["how", "is", "it", "going"]],
          "responses": ["I'm doing well, thanks for asking."] },
        { "utterances": [["what", "is", "your", "name"]],
          "responses": ["My name is Marcus.", "People call me Marcus."] },
        { "utterances": [["good", "morning"]],
          "responses": ["Good morning to you too!"] }
    ]"#;

    fn corpus() -> Corpus {
        Corpus::from_json(CORPUS).unwrap()
    }

    #[test]
    fn tokens_join_into_candidates() {
        let corpus = corpus();
        assert_eq!(corpus.intents().len(), 3);
        assert_eq!(
            corpus.intents()[0].candidates(),
            &["how are you".to_string(), "how is it going".to_string()]
        );
    }

    #[test]
    fn exact_phrase_matches_with_zero_distance() {
        let corpus = corpus();
        let found = corpus.best_match("what is your name").unwrap();
        assert_eq!(found.intent, 1);
        assert_eq!(found.distance, 0);
    }

    #[test]
    fn near_miss_within_half_the_candidate_matches() {
        let corpus = corpus();
        // "how are you doing" is 6 edits from "how are you" (bound 5): no.
        // "how r you" is 2 edits: yes.
        let found = corpus.best_match("how r you").unwrap();
        assert_eq!(found.candidate, "how are you");
        assert!(corpus.best_match("how are you doing").is_none());
    }

    #[test]
    fn bound_is_strict() {
        let corpus = Corpus::from_json(r#"[{"utterances": [["abcd"]], "responses": ["x"]}]"#)
            .unwrap();
        // bound is 4 / 2 = 2
        assert!(corpus.best_match("abxy").is_none());
        assert!(corpus.best_match("abcx").is_some());
    }

    #[test]
    fn unrelated_input_has_no_match() {
        let corpus = corpus();
        assert!(corpus.best_match("turn on the lights").is_none());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(corpus.respond("turn on the lights", &mut rng), None);
    }

    #[test]
    fn closest_candidate_wins() {
        let corpus = Corpus::from_json(
            r#"[
                {"utterances": [["good", "night"]], "responses": ["night"]},
                {"utterances": [["good", "morning"]], "responses": ["morning"]}
            ]"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(corpus.respond("good mornin", &mut rng), Some("morning"));
    }

    #[test]
    fn responses_come_from_the_matched_intent() {
        let corpus = corpus();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let reply = corpus.respond("what is your name", &mut rng).unwrap();
            assert!(corpus.intents()[1].responses().iter().any(|r| r == reply));
        }
    }

    #[test]
    fn intents_without_responses_are_rejected() {
        let err = Corpus::from_json(r#"[{"utterances": [["hi"]], "responses": []}]"#)
            .unwrap_err();
        assert!(matches!(err, CorpusError::NoResponses { index: 0 }));
        assert!(matches!(
            Corpus::from_json("{not json"),
            Err(CorpusError::Json(_))
        ));
    }

    #[test]
    fn load_reports_missing_files() {
        let err = Corpus::load(Path::new("/no/such/corpus.json")).unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
