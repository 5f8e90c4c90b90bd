/*!
Binary evaluation of a hate-speech classifier. Gold examples and predictions are two
collections of records keyed by the `problem` text; only the problems present in both are
evaluated.
*/
use crate::metrics::{classification_report, EvaluationError};
use crate::reporter::ClassificationReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Raw label as found in the JSON lines. Gold files usually hold numbers or booleans while
/// classifiers output strings, so every label is compared through its textual form. Integral
/// floats display without a fractional part, `1.0` and `1` are the same label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldExample {
    pub problem: String,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedExample {
    pub problem: String,
    pub classification: Label,
}

/// Gold and predicted labels of the problems found in both collections, sorted by problem.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinedLabels {
    pub problems: Vec<String>,
    pub references: Vec<String>,
    pub predictions: Vec<String>,
}

impl JoinedLabels {
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Joins gold and predicted labels on the problem text. When a problem appears more than once
/// in a collection, its last record wins.
pub fn extract_labels<G, P>(gold: G, predicted: P) -> JoinedLabels
where
    G: IntoIterator<Item = GoldExample>,
    P: IntoIterator<Item = PredictedExample>,
{
    let gold: BTreeMap<String, Label> = gold.into_iter().map(|g| (g.problem, g.label)).collect();
    let predicted: BTreeMap<String, Label> = predicted
        .into_iter()
        .map(|p| (p.problem, p.classification))
        .collect();
    let mut joined = JoinedLabels::default();
    for (problem, label) in gold.iter() {
        if let Some(prediction) = predicted.get(problem) {
            joined.problems.push(problem.clone());
            joined.references.push(label.to_string());
            joined.predictions.push(prediction.to_string());
        }
    }
    let dropped = gold.len() + predicted.len() - 2 * joined.len();
    if dropped > 0 {
        tracing::warn!(
            dropped,
            joined = joined.len(),
            "some problems are missing from the gold or predicted examples"
        );
    }
    joined
}

/// A joined problem whose prediction differs from its gold label. `index` is the position of
/// the problem in the joined labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMismatch {
    pub index: usize,
    pub gold: String,
    pub predicted: String,
}

impl Display for LabelMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Index: {}, Gold: {}, Predicted: {}",
            self.index, self.gold, self.predicted
        )
    }
}

pub fn misclassifications(joined: &JoinedLabels) -> Vec<LabelMismatch> {
    joined
        .references
        .iter()
        .zip(joined.predictions.iter())
        .enumerate()
        .filter(|(_, (r, p))| r != p)
        .map(|(index, (r, p))| LabelMismatch {
            index,
            gold: r.clone(),
            predicted: p.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HateSpeechReport {
    pub report: ClassificationReport,
    pub misclassifications: Vec<LabelMismatch>,
}

impl Display for HateSpeechReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.report)?;
        writeln!(f)?;
        write!(f, "{}", self.report.confusion_matrix)
    }
}

/// Joins the two collections and builds the classification report of the joined problems.
///
/// #Example
/// ```rust
/// use erisk_eval::{evaluate_hate_speech, GoldExample, Label, PredictedExample};
///
/// let gold = vec![
///     GoldExample { problem: String::from("p1"), label: Label::Int(1) },
///     GoldExample { problem: String::from("p2"), label: Label::Int(0) },
/// ];
/// let predicted = vec![
///     PredictedExample { problem: String::from("p2"), classification: Label::Text(String::from("1")) },
///     PredictedExample { problem: String::from("p1"), classification: Label::Text(String::from("1")) },
/// ];
/// let evaluation = evaluate_hate_speech(gold, predicted).unwrap();
/// assert_eq!(evaluation.report.accuracy, 0.5);
/// assert_eq!(evaluation.misclassifications[0].to_string(), "Index: 1, Gold: 0, Predicted: 1");
/// ```
pub fn evaluate_hate_speech<G, P>(
    gold: G,
    predicted: P,
) -> Result<HateSpeechReport, EvaluationError>
where
    G: IntoIterator<Item = GoldExample>,
    P: IntoIterator<Item = PredictedExample>,
{
    let joined = extract_labels(gold, predicted);
    if joined.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("joined problems")));
    }
    let report = classification_report(&joined.references, &joined.predictions)?;
    tracing::info!(
        problems = joined.len(),
        accuracy = report.accuracy,
        "hate speech evaluation"
    );
    Ok(HateSpeechReport {
        report,
        misclassifications: misclassifications(&joined),
    })
}
