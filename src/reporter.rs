/**
This modules gives a few tools to prettyprint the eRisk metrics, the misclassified subjects and
the classification reports.
*/
use crate::metrics::ScoredSubject;
use crate::symptoms::Evidence;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Metrics of one eRisk evaluation for a given value of `o`. The ERDE is expressed as a
/// percentage, the other metrics are between 0 and 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EriskMetrics {
    /// ERDE parameter used for this evaluation
    pub o: f64,
    /// Global ERDE, i.e. the mean of the per-subject contributions times 100
    pub erde: f64,
    /// Precision of the positive decisions
    pub precision: f64,
    /// Recall of the positive decisions
    pub recall: f64,
    /// F1 of the positive decisions
    pub f1: f64,
    /// ERDE contribution of every subject, in the order they were scored
    pub per_subject: Array1<f64>,
}

/// Displayed as a line of a dataframe.
impl Display for EriskMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ERDE_{}, {:.2}, {:.4}, {:.4}, {:.4}",
            self.o, self.erde, self.precision, self.recall, self.f1
        )
    }
}

/// A subject whose final decision differs from its gold label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Misclassification {
    pub subject: String,
    pub gold: bool,
    pub decision: bool,
    /// Evidence accumulated for the subject when the stream ended
    pub evidence: Evidence,
}

impl From<&ScoredSubject> for Misclassification {
    fn from(value: &ScoredSubject) -> Self {
        Self {
            subject: value.subject.clone(),
            gold: value.triple.gold,
            decision: value.triple.decision,
            evidence: value.evidence.clone(),
        }
    }
}

/// Displayed as a two line block: the subject with its labels, then its criteria.
impl Display for Misclassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "User ID: {}, Golden: {}, Predicted: {}",
            self.subject, self.gold, self.decision
        )?;
        writeln!(f, "Criteria: {}", self.evidence)
    }
}

/// Result of a full eRisk evaluation. It holds one `EriskMetrics` per value of `o` and the
/// misclassified subjects. When displayed, it acts as a dataframe.
///
/// # Example
///
/// ```rust
/// use erisk_eval::{evaluate_erisk_conf, DefaultEriskConfig, GroundTruthStore, PostRecord};
///
/// let golden: GroundTruthStore = "subject1 1\nsubject2 0".parse().unwrap();
/// let long_text = "a".repeat(301);
/// let records = vec![
///     PostRecord::new("subject1", &long_text, ["DEPRESSED_MOOD", "FATIGUE", "SLEEP_ISSUES"]),
///     PostRecord::new("subject1", &long_text, ["WORTHLESSNESS", "PSYCHOMOTOR"]),
///     PostRecord::new("subject2", &long_text, ["NO_SYMPTOMS"]),
/// ];
/// let report = evaluate_erisk_conf(&golden, &records, DefaultEriskConfig::default()).unwrap();
/// let expected = "Metric, ERDE, Precision, Recall, F1
/// ERDE_5, 2.37, 1.0000, 1.0000, 1.0000
/// ERDE_50, 0.00, 1.0000, 1.0000, 1.0000\n";
/// assert_eq!(expected, report.to_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EriskReport {
    /// Number of scored subjects
    pub subjects: usize,
    /// Number of scored subjects with a positive gold label
    pub positives: usize,
    pub metrics: Vec<EriskMetrics>,
    /// Per-class report of the gold labels against the decisions, `false` and `true` classes
    pub classification: ClassificationReport,
    pub misclassifications: Vec<Misclassification>,
}

impl Display for EriskReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Metric, ERDE, Precision, Recall, F1")?;
        for m in self.metrics.iter() {
            writeln!(f, "{}", m)?
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Datastructure holding metrics about a given class.
pub struct ClassMetrics {
    /// The class, such as "true", "false", "hate", etc.
    pub class: String,
    /// Precision metric
    pub precision: f64,
    /// Recall metric
    pub recall: f64,
    /// Fscore metric
    pub fscore: f64,
    /// Support metric
    pub support: usize,
}

/// The Classmetrics struct acts as a line in a dataframe when displayed.
impl Display for ClassMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {:.4}, {:.4}, {:.4}, {}",
            self.class, self.precision, self.recall, self.fscore, self.support
        )
    }
}

/// Confusion matrix. Rows are the true labels, columns the predicted labels, both in the order
/// of `labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    pub(crate) fn new(labels: Vec<String>, counts: Array2<usize>) -> Self {
        Self { labels, counts }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Divides each row by its sum, i.e. by the number of samples of that true class. Rows
    /// without any sample stay at 0.
    pub fn normalized(&self) -> Array2<f64> {
        let mut normalized = self.counts.mapv(|x| x as f64);
        for mut row in normalized.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|v| v / total);
            }
        }
        normalized
    }
}

/// Displayed as a dataframe with the true labels as rows.
impl Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "True\\Predicted")?;
        for label in self.labels.iter() {
            write!(f, ", {}", label)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(self.counts.rows()) {
            write!(f, "{}", label)?;
            for count in row.iter() {
                write!(f, ", {}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Per-class metrics, accuracy, macro and weighted averages. It can be built with the
/// `classification_report` function.
///
/// # Example
///
/// ```rust
/// use erisk_eval::classification_report;
///
/// let y_true = vec![true, true, false, false];
/// let y_pred = vec![true, false, true, false];
/// let report = classification_report(&y_true, &y_pred).unwrap();
/// let expected_report = "Class, Precision, Recall, Fscore, Support
/// false, 0.5000, 0.5000, 0.5000, 2
/// true, 0.5000, 0.5000, 0.5000, 2
/// Accuracy, , , 0.5000, 4
/// Overall_Macro, 0.5000, 0.5000, 0.5000, 4
/// Overall_Weighted, 0.5000, 0.5000, 0.5000, 4\n";
/// assert_eq!(expected_report, report.to_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion_matrix: ConfusionMatrix,
}

impl Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Class, Precision, Recall, Fscore, Support")?;
        for c in self.classes.iter() {
            writeln!(f, "{}", c)?
        }
        writeln!(f, "Accuracy, , , {:.4}, {}", self.accuracy, self.macro_avg.support)?;
        writeln!(f, "{}", self.macro_avg)?;
        writeln!(f, "{}", self.weighted_avg)
    }
}
