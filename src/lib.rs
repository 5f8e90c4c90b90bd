/*!
This library evaluates early risk detection systems, as done in the eRisk shared tasks. A
classifier reads the posts of each subject in chronological order and tags them with the
depression symptoms they exhibit. The library accumulates these tags per subject, decides when
a subject should be flagged as at-risk and scores the decisions with the Early Risk Detection
Error (ERDE), which penalizes late correct decisions.

# Pipeline
* The golden truth (`GroundTruthStore`) gives a binary label to every subject.
* The `EvidenceAccumulator` folds the stream of `PostRecord`s into one `SubjectState` per
    subject. Posts shorter than the minimum length are ignored.
* A `RiskDecisionPolicy` looks at the accumulated `Evidence` after every admitted post. The
    default `SymptomThresholdPolicy` flags a subject once five distinct symptoms are observed,
    one of them being a depressed mood or anhedonia.
* `erde_report` computes the ERDE, precision, recall and f-score for each value of `o`.

# Terminology
* The delay of a flagged subject is the position of the last post read before the flagging
    post, or of its first post when it is flagged right away. A subject never flagged gets the
    position of its last post.
* `o` is the delay at which the penalty of a correct decision reaches 0.5. The eRisk tasks
    report ERDE_5 and ERDE_50.
* `NO_SYMPTOMS` is a sentinel emitted by the classifier. It is never evidence.

The library also offers the tools around the main evaluation: voting over sampled
completions of a language model, extraction of the final answer of a completion and the
binary evaluation of a hate-speech classifier.
*/

mod accumulator;
mod config;
mod ground_truth;
mod hate_speech;
mod metrics;
mod policy;
mod reporter;
mod symptoms;
mod voting;

// The public api starts here
pub use symptoms::{parse_tags, Evidence, SymptomTag, TagParsingError};

pub use policy::{AnySymptomPolicy, RiskDecisionPolicy, SymptomThresholdPolicy};

pub use ground_truth::{GroundTruthParseError, GroundTruthStore};

pub use accumulator::{
    EvidenceAccumulator, Judgement, MissingSubjectError, MissingSubjectStrat, PostCounting,
    PostObservation, PostRecord, SubjectState, DEFAULT_MIN_TEXT_LEN,
};

pub use metrics::{
    classification_report, erde_contribution, erde_eval, erde_report, EvaluationError,
    InconsistentLengthError, ScoredSubject, ScoredTriple,
};

pub use reporter::{
    ClassMetrics, ClassificationReport, ConfusionMatrix, EriskMetrics, EriskReport,
    Misclassification,
};

pub use config::{DefaultEriskConfig, EriskConfig, EriskConfigBuilder, DEFAULT_OS};

pub use hate_speech::{
    evaluate_hate_speech, extract_labels, misclassifications, GoldExample, HateSpeechReport,
    JoinedLabels, Label, LabelMismatch, PredictedExample,
};

pub use voting::{
    extract_answer, find_answer_with_largest_sum, find_majority_answer, find_naive_answer,
    subsample_completions, vote, CanonicalAnswer, Subsample, VotedAnswers,
};

/// Main entrypoint of the library. This function streams the records through a fresh
/// `EvidenceAccumulator`, pairs the judged subjects with the golden truth and computes the
/// metrics for every value of `o` of the config. Records must be given in chronological
/// order.
///
/// * `golden`: Gold label of every subject
/// * `records`: Classified posts, in arrival order
/// * `config`: Decision policy and evaluation parameters.
///
/// #Example
/// ```rust
/// use erisk_eval::{evaluate_erisk_conf, EriskConfigBuilder, GroundTruthStore, PostCounting, PostRecord};
///
/// let golden: GroundTruthStore = "subject1 1".parse().unwrap();
/// let records = vec![
///     PostRecord::new("subject1", "too short", ["DEPRESSED_MOOD"]),
///     PostRecord::new("subject1", &"a".repeat(400), ["DEPRESSED_MOOD", "FATIGUE", "ANHEDONIA"]),
///     PostRecord::new("subject1", &"a".repeat(400), ["SLEEP_ISSUES", "WORTHLESSNESS"]),
/// ];
/// let config = EriskConfigBuilder::default()
///     .post_counting(PostCounting::OneBased)
///     .os([1.0])
///     .build();
/// let report = evaluate_erisk_conf(&golden, &records, config).unwrap();
/// assert_eq!(report.metrics[0].erde, 50.0);
/// assert!(report.misclassifications.is_empty());
/// ```
pub fn evaluate_erisk_conf<'a, P, I>(
    golden: &GroundTruthStore,
    records: I,
    config: EriskConfig<P>,
) -> Result<EriskReport, EvaluationError>
where
    P: RiskDecisionPolicy + Clone,
    I: IntoIterator<Item = &'a PostRecord>,
{
    let mut accumulator = config.accumulator();
    let admitted = accumulator.observe_all(records);
    tracing::debug!(admitted, "stream consumed");
    let subjects = accumulator.scored_subjects(golden, config.missing_subjects())?;
    erde_report(&subjects, config.os(), config.parallel())
}
