pub mod html;

use serde::{Deserialize, Serialize};

/// One ranked entry of a classification, with a display-ready label.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub class_id: String,
    pub label: String,
    pub score: f32,
}

/// Top-ranked predictions for a single image, best first.
///
/// Holds at most [`PredictionResult::MAX_LEN`] entries, each with a score in `[0, 1]`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PredictionResult {
    predictions: Vec<Prediction>,
}

impl PredictionResult {
    pub const MAX_LEN: usize = 5;

    /// Builds a result from `(class id, raw label, score)` triples.
    ///
    /// Raw labels go through [`format_label`]. Entries are re-sorted by descending
    /// score, scores are clamped into `[0, 1]` (NaN becomes 0) and anything past
    /// `MAX_LEN` is dropped.
    pub fn from_ranked<I, S, L>(ranked: I) -> Self
    where
        I: IntoIterator<Item = (S, L, f32)>,
        S: Into<String>,
        L: AsRef<str>,
    {
        let mut predictions: Vec<Prediction> = ranked
            .into_iter()
            .map(|(class_id, raw_label, score)| Prediction {
                class_id: class_id.into(),
                label: format_label(raw_label.as_ref()),
                score: if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) },
            })
            .collect();

        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
        predictions.truncate(Self::MAX_LEN);
        Self { predictions }
    }

    pub fn top(&self) -> Option<&Prediction> {
        self.predictions.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter()
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// Turns a raw class label such as `tabby_cat` into `Tabby Cat`.
///
/// Underscores become spaces and every word is title-cased: a letter is upper-cased
/// when it does not follow another letter, lower-cased otherwise, so
/// `jack-o'-lantern` renders as `Jack-O'-Lantern`.
pub fn format_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_is_letter = false;

    for ch in raw.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if prev_is_letter {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        prev_is_letter = ch.is_alphabetic();
    }
    out
}
