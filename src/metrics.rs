/**
This module scores the finished decisions: the ERDE (early risk detection error) metric with
precision, recall and f-score of the positive class, and a multi-class classification report.
*/
use crate::accumulator::MissingSubjectError;
use crate::reporter::{
    ClassMetrics, ClassificationReport, ConfusionMatrix, EriskMetrics, EriskReport,
};
use crate::symptoms::Evidence;
use core::fmt;
use itertools::multizip;
use ndarray::{prelude::*, Zip};
use ndarray_stats::{errors::MultiInputError, SummaryStatisticsExt};
use num::{Float, NumCast};
use std::{
    collections::BTreeSet,
    error::Error,
    fmt::Display,
};

#[derive(Debug, PartialEq, Clone, Copy)]
/// Error type to represent when two lists or arrays are not of the
/// same length (when they should be).
pub struct InconsistentLengthError(pub usize, pub usize);

impl Display for InconsistentLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inconsistent length between two lists. The first one is length {}, the second one is length {}",
            self.0, self.1
        )
    }
}
impl Error for InconsistentLengthError {}

#[derive(Debug, Clone, PartialEq)]
/// Enum error encompassing the failures that can happen when building the scored subjects and
/// computing the metrics.
pub enum EvaluationError {
    InconsistentLength(InconsistentLengthError),
    EmptyInput(String),
    MissingSubject(MissingSubjectError),
    InputError(MultiInputError),
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentLength(length_err) => std::fmt::Display::fmt(length_err, f),
            Self::EmptyInput(which) => write!(f, "Received an empty input {}", which),
            Self::MissingSubject(missing_err) => std::fmt::Display::fmt(missing_err, f),
            Self::InputError(input_err) => std::fmt::Display::fmt(input_err, f),
        }
    }
}
impl Error for EvaluationError {}

impl From<InconsistentLengthError> for EvaluationError {
    fn from(value: InconsistentLengthError) -> Self {
        Self::InconsistentLength(value)
    }
}
impl From<MissingSubjectError> for EvaluationError {
    fn from(value: MissingSubjectError) -> Self {
        Self::MissingSubject(value)
    }
}
impl From<MultiInputError> for EvaluationError {
    fn from(value: MultiInputError) -> Self {
        Self::InputError(value)
    }
}

pub(crate) fn check_consistent_length<A, B>(
    a: &[A],
    b: &[B],
) -> Result<(), InconsistentLengthError> {
    if a.len() != b.len() {
        return Err(InconsistentLengthError(a.len(), b.len()));
    }
    Ok(())
}

/// One scored subject: gold label, final decision and the delay attached to the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredTriple {
    pub gold: bool,
    pub decision: bool,
    pub delay: usize,
}

/// A scored triple with the subject it belongs to and the evidence behind the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSubject {
    pub subject: String,
    pub triple: ScoredTriple,
    pub evidence: Evidence,
}

/// ERDE contribution of a single subject.
///
/// * `gold`: Is the subject actually at risk?
/// * `decision`: Was the subject flagged?
/// * `delay`: Position of the post at which the decision was taken.
/// * `o`: Position at which the penalty of a correct decision reaches 0.5.
/// * `positive_rate`: Fraction of gold positives in the collection, the cost of a false alarm.
#[inline]
pub fn erde_contribution<F: Float>(
    gold: bool,
    decision: bool,
    delay: usize,
    o: F,
    positive_rate: F,
) -> F {
    match (gold, decision) {
        (false, true) => positive_rate,
        (true, false) => F::one(),
        (true, true) => {
            // An uncastable delay is infinitely late
            let delay: F = <F as NumCast>::from(delay).unwrap_or_else(F::infinity);
            F::one() - F::one() / (F::one() + (delay - o).exp())
        }
        (false, false) => F::zero(),
    }
}

#[inline]
fn safe_ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[inline]
fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Computes the ERDE metric for a single value of `o`, as well as the precision, recall and
/// f-score of the positive class. The three slices hold one entry per subject.
///
/// * `references`: Gold labels
/// * `predictions`: Final decisions
/// * `delays`: Position at which each decision was taken
/// * `o`: ERDE parameter
/// * `parallel`: Can we use multiple cores to compute the per-subject contributions?
pub fn erde_eval(
    references: &[bool],
    predictions: &[bool],
    delays: &[usize],
    o: f64,
    parallel: bool,
) -> Result<EriskMetrics, EvaluationError> {
    check_consistent_length(references, predictions)?;
    check_consistent_length(predictions, delays)?;
    if references.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("references")));
    }
    let total_users = references.len();
    let true_pos = references.iter().filter(|r| **r).count();
    let pos_decisions = predictions.iter().filter(|p| **p).count();
    let pos_hits = references
        .iter()
        .zip(predictions)
        .filter(|(r, p)| **r && **p)
        .count();
    let positive_rate = safe_ratio(true_pos, total_users);

    let zip = Zip::from(ArrayView1::from(references))
        .and(ArrayView1::from(predictions))
        .and(ArrayView1::from(delays));
    let contribution =
        |g: &bool, p: &bool, d: &usize| erde_contribution(*g, *p, *d, o, positive_rate);
    let per_subject: Array1<f64> = if parallel {
        zip.par_map_collect(contribution)
    } else {
        zip.map_collect(contribution)
    };
    let erde = per_subject
        .mean()
        .ok_or_else(|| EvaluationError::EmptyInput(String::from("erde")))?
        * 100.0;

    let precision = safe_ratio(pos_hits, pos_decisions);
    let recall = safe_ratio(pos_hits, true_pos);
    let f1 = harmonic_mean(precision, recall);
    tracing::info!(
        o,
        erde,
        precision,
        recall,
        f1,
        "global ERDE over {} subjects",
        total_users
    );
    Ok(EriskMetrics {
        o,
        erde,
        precision,
        recall,
        f1,
        per_subject,
    })
}

/// Main entrypoint of the scoring side. Evaluates the scored subjects once for every value of
/// `o` and collects the misclassified subjects.
///
/// #Example
/// ```rust
/// use erisk_eval::{erde_report, ScoredSubject, ScoredTriple, Evidence};
///
/// let subjects: Vec<ScoredSubject> = [(true, true, 3), (true, false, 7), (false, true, 2), (false, false, 9)]
///     .into_iter()
///     .enumerate()
///     .map(|(i, (gold, decision, delay))| ScoredSubject {
///         subject: format!("subject{}", i),
///         triple: ScoredTriple { gold, decision, delay },
///         evidence: Evidence::new(),
///     })
///     .collect();
/// let report = erde_report(&subjects, &[5.0], false).unwrap();
/// let metrics = &report.metrics[0];
/// assert!((metrics.erde - 40.48).abs() < 0.01);
/// assert_eq!(metrics.f1, 0.5);
/// assert_eq!(report.misclassifications.len(), 2);
/// assert_eq!(report.classification.accuracy, 0.5);
/// ```
pub fn erde_report(
    subjects: &[ScoredSubject],
    os: &[f64],
    parallel: bool,
) -> Result<EriskReport, EvaluationError> {
    if os.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("o")));
    }
    let mut references = Vec::with_capacity(subjects.len());
    let mut predictions = Vec::with_capacity(subjects.len());
    let mut delays = Vec::with_capacity(subjects.len());
    for s in subjects {
        references.push(s.triple.gold);
        predictions.push(s.triple.decision);
        delays.push(s.triple.delay);
    }
    let metrics = os
        .iter()
        .map(|o| erde_eval(&references, &predictions, &delays, *o, parallel))
        .collect::<Result<Vec<_>, _>>()?;
    let classification = classification_report(&references, &predictions)?;
    let misclassifications = subjects
        .iter()
        .filter(|s| s.triple.gold != s.triple.decision)
        .map(crate::reporter::Misclassification::from)
        .collect();
    Ok(EriskReport {
        subjects: subjects.len(),
        positives: references.iter().filter(|r| **r).count(),
        metrics,
        classification,
        misclassifications,
    })
}

/// Builds a multi-class classification report from the true and predicted labels. Classes are
/// the sorted union of the labels found in both lists. Precision, recall and f-score are
/// replaced by 0 whenever their denominator is 0.
pub fn classification_report<L>(
    references: &[L],
    predictions: &[L],
) -> Result<ClassificationReport, EvaluationError>
where
    L: Ord + Clone + Display,
{
    check_consistent_length(references, predictions)?;
    if references.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("references")));
    }
    let labels: Vec<&L> = BTreeSet::from_iter(references.iter().chain(predictions.iter()))
        .into_iter()
        .collect();
    let position = |l: &L| labels.binary_search(&l).unwrap_or_default();
    let mut counts = Array2::<usize>::zeros((labels.len(), labels.len()));
    for (r, p) in references.iter().zip(predictions) {
        counts[[position(r), position(p)]] += 1;
    }
    let tp_sum = counts.diag().to_owned();
    let pred_sum = counts.sum_axis(Axis(0));
    let true_sum = counts.sum_axis(Axis(1));

    let mut classes = Vec::with_capacity(labels.len());
    let columns = (labels.iter(), tp_sum.iter(), pred_sum.iter(), true_sum.iter());
    for (label, tp, pred, support) in multizip(columns) {
        let precision = safe_ratio(*tp, *pred);
        let recall = safe_ratio(*tp, *support);
        classes.push(ClassMetrics {
            class: label.to_string(),
            precision,
            recall,
            fscore: harmonic_mean(precision, recall),
            support: *support,
        });
    }
    let precision = Array::from_iter(classes.iter().map(|c| c.precision));
    let recall = Array::from_iter(classes.iter().map(|c| c.recall));
    let fscore = Array::from_iter(classes.iter().map(|c| c.fscore));
    let weights = true_sum.mapv(|x| x as f64);
    let total = references.len();

    let empty = || EvaluationError::EmptyInput(String::from("labels"));
    let macro_avg = ClassMetrics {
        class: String::from("Overall_Macro"),
        precision: precision.mean().ok_or_else(empty)?,
        recall: recall.mean().ok_or_else(empty)?,
        fscore: fscore.mean().ok_or_else(empty)?,
        support: total,
    };
    let weighted_avg = ClassMetrics {
        class: String::from("Overall_Weighted"),
        precision: precision.weighted_mean(&weights)?,
        recall: recall.weighted_mean(&weights)?,
        fscore: fscore.weighted_mean(&weights)?,
        support: total,
    };
    Ok(ClassificationReport {
        accuracy: safe_ratio(tp_sum.sum(), total),
        classes,
        macro_avg,
        weighted_avg,
        confusion_matrix: ConfusionMatrix::new(
            labels.into_iter().map(|l| l.to_string()).collect(),
            counts,
        ),
    })
}
