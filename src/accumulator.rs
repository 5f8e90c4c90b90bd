/*!
Folds the stream of classified posts into one decision per subject. Every subject starts
`Unjudged`; each admitted post moves it through `SubjectState::observe`, which merges the post's
tags into the evidence, asks the decision policy for a verdict and updates the delay.
*/
use crate::ground_truth::GroundTruthStore;
use crate::metrics::{EvaluationError, ScoredSubject, ScoredTriple};
use crate::policy::RiskDecisionPolicy;
use crate::symptoms::{parse_tags, Evidence, SymptomTag};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fmt::{self, Debug, Display},
    str::FromStr,
};

/// Posts whose text is not strictly longer than this number of characters are ignored.
pub const DEFAULT_MIN_TEXT_LEN: usize = 300;

/// One line of the prediction stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub subject: String,
    /// Only used to measure the length of the post
    pub text: String,
    #[serde(default)]
    pub classification: Vec<String>,
}

impl PostRecord {
    pub fn new<I, S>(subject: &str, text: &str, classification: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: String::from(subject),
            text: String::from(text),
            classification: classification.into_iter().map(Into::into).collect(),
        }
    }
}

/// An admitted post: its subject, its position in the subject's stream and its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostObservation {
    pub subject: String,
    pub position: usize,
    pub tags: Vec<SymptomTag>,
}

/// How the post counter of a subject is numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostCounting {
    /// The counter starts at 1 and is incremented before being read: the first admitted post
    /// of a subject is post 2. The delays of the reference eRisk runs use this numbering.
    #[default]
    Legacy,
    /// The first admitted post of a subject is post 1.
    OneBased,
}

impl PostCounting {
    /// Position of the `nth` admitted post (`nth` starts at 1).
    #[inline]
    pub fn position(&self, nth: usize) -> usize {
        match self {
            Self::Legacy => nth + 1,
            Self::OneBased => nth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingPostCountingError(String);

impl Display for ParsingPostCountingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse the {} into a `PostCounting`", self.0)
    }
}
impl Error for ParsingPostCountingError {}

impl FromStr for PostCounting {
    type Err = ParsingPostCountingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "legacy" => Ok(Self::Legacy),
            "onebased" | "one_based" | "one-based" => Ok(Self::OneBased),
            _ => Err(ParsingPostCountingError(String::from(s))),
        }
    }
}

/// What do we do with a subject found in the stream but absent from the golden truth?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSubjectStrat {
    /// Leave the subject out of the scoring and log a warning
    #[default]
    Skip,
    /// Stop and return a `MissingSubjectError`
    ReturnError,
}

/// `true` means strict, i.e. `ReturnError`.
impl From<bool> for MissingSubjectStrat {
    fn from(strict: bool) -> Self {
        if strict {
            Self::ReturnError
        } else {
            Self::Skip
        }
    }
}

#[derive(Debug)]
pub struct ParsingMissingSubjectStrategyError<S: Debug + Display>(S);

impl<S: Debug + Display> Display for ParsingMissingSubjectStrategyError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse the {} into a `MissingSubjectStrat`", self.0)
    }
}
impl<S: Debug + Display> Error for ParsingMissingSubjectStrategyError<S> {}

impl FromStr for MissingSubjectStrat {
    type Err = ParsingMissingSubjectStrategyError<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "skip" => Ok(Self::Skip),
            "returnerror" | "error" => Ok(Self::ReturnError),
            _ => Err(ParsingMissingSubjectStrategyError(String::from(s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSubjectError(pub String);

impl Display for MissingSubjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject `{}` has posts but no golden truth entry", self.0)
    }
}
impl Error for MissingSubjectError {}

/// Decision state of a subject with at least one admitted post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgement {
    pub evidence: Evidence,
    /// Sticky: once a subject is flagged, it stays flagged.
    pub decided: bool,
    /// Position of the last post observed while undecided, frozen once `decided` is set.
    pub delay: usize,
    /// Number of admitted posts
    pub posts_seen: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubjectState {
    /// No admitted post yet. Such subjects are not scored.
    #[default]
    Unjudged,
    Judged(Judgement),
}

impl SubjectState {
    /// State transition for one admitted post.
    pub fn observe<P, I>(self, tags: I, counting: PostCounting, policy: &P) -> SubjectState
    where
        P: RiskDecisionPolicy + ?Sized,
        I: IntoIterator<Item = SymptomTag>,
    {
        let previous = match self {
            Self::Unjudged => None,
            Self::Judged(judgement) => Some(judgement),
        };
        let (mut evidence, was_decided, posts_seen, delay) = match previous {
            Some(j) => (j.evidence, j.decided, j.posts_seen + 1, Some(j.delay)),
            None => (Evidence::new(), false, 1, None),
        };
        evidence.extend(tags);
        let decided = was_decided || policy.decide(&evidence);
        let position = counting.position(posts_seen);
        let delay = match delay {
            Some(d) if decided => d,
            _ => position,
        };
        Self::Judged(Judgement {
            evidence,
            decided,
            delay,
            posts_seen,
        })
    }

    pub fn judgement(&self) -> Option<&Judgement> {
        match self {
            Self::Unjudged => None,
            Self::Judged(j) => Some(j),
        }
    }

    pub fn is_judged(&self) -> bool {
        matches!(self, Self::Judged(_))
    }
}

/// Keeps the state of every subject seen in the stream. Records must be observed in arrival
/// order: the delay of a subject is the position of one of its posts.
#[derive(Debug, Clone)]
pub struct EvidenceAccumulator<P: RiskDecisionPolicy> {
    policy: P,
    min_text_len: usize,
    counting: PostCounting,
    states: AHashMap<String, SubjectState>,
    /// Subjects in order of first admitted post
    order: Vec<String>,
}

impl<P: RiskDecisionPolicy> EvidenceAccumulator<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            counting: PostCounting::default(),
            states: AHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }

    pub fn counting(mut self, counting: PostCounting) -> Self {
        self.counting = counting;
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Is the post long enough to be taken into account?
    #[inline]
    pub fn admits(&self, text: &str) -> bool {
        text.chars().count() > self.min_text_len
    }

    /// Observes a single record. Returns `true` if the record was admitted.
    pub fn observe(&mut self, record: &PostRecord) -> bool {
        if !self.admits(&record.text) {
            tracing::trace!(subject = %record.subject, "post too short, ignored");
            return false;
        }
        let tags = parse_tags(&record.classification);
        self.observe_post(&record.subject, tags);
        true
    }

    /// Observes already parsed tags for a subject, bypassing the length filter. Returns the
    /// admitted observation, with the position given to the post.
    pub fn observe_post<I: IntoIterator<Item = SymptomTag>>(
        &mut self,
        subject: &str,
        tags: I,
    ) -> PostObservation {
        if !self.states.contains_key(subject) {
            self.order.push(String::from(subject));
        }
        let tags: Vec<SymptomTag> = tags.into_iter().collect();
        let state = self.states.entry(String::from(subject)).or_default();
        let was_decided = state.judgement().is_some_and(|j| j.decided);
        let next = std::mem::take(state).observe(tags.iter().copied(), self.counting, &self.policy);
        let posts_seen = next.judgement().map_or(0, |j| j.posts_seen);
        if let (false, Some(j)) = (was_decided, next.judgement()) {
            if j.decided {
                tracing::debug!(
                    subject,
                    delay = j.delay,
                    evidence = j.evidence.len(),
                    "subject flagged at risk"
                );
            }
        }
        *state = next;
        PostObservation {
            subject: String::from(subject),
            position: self.counting.position(posts_seen),
            tags,
        }
    }

    /// Observes every record in order. Returns the number of admitted records.
    pub fn observe_all<'a, I: IntoIterator<Item = &'a PostRecord>>(&mut self, records: I) -> usize {
        records
            .into_iter()
            .map(|r| self.observe(r))
            .filter(|admitted| *admitted)
            .count()
    }

    /// State of a subject. Subjects never seen are `Unjudged`.
    pub fn state(&self, subject: &str) -> &SubjectState {
        const UNJUDGED: &SubjectState = &SubjectState::Unjudged;
        self.states.get(subject).unwrap_or(UNJUDGED)
    }

    /// Judged subjects, in order of first admitted post.
    pub fn judged(&self) -> impl Iterator<Item = (&str, &Judgement)> {
        self.order.iter().filter_map(|s| {
            self.states
                .get(s)
                .and_then(|state| state.judgement())
                .map(|j| (s.as_str(), j))
        })
    }

    /// Pairs every judged subject with its gold label. Subjects are returned in the order of
    /// the golden truth; unjudged subjects are left out. Judged subjects without a gold label
    /// are skipped or reported depending on `missing`.
    pub fn scored_subjects(
        &self,
        golden: &GroundTruthStore,
        missing: MissingSubjectStrat,
    ) -> Result<Vec<ScoredSubject>, EvaluationError> {
        for (subject, _) in self.judged() {
            if golden.contains(subject) {
                continue;
            }
            match missing {
                MissingSubjectStrat::ReturnError => {
                    return Err(MissingSubjectError(String::from(subject)).into())
                }
                MissingSubjectStrat::Skip => {
                    tracing::warn!(subject, "subject has no golden truth entry, skipped")
                }
            }
        }
        let scored = golden
            .iter()
            .filter_map(|(subject, gold)| {
                self.state(subject).judgement().map(|j| ScoredSubject {
                    subject: String::from(subject),
                    triple: ScoredTriple {
                        gold,
                        decision: j.decided,
                        delay: j.delay,
                    },
                    evidence: j.evidence.clone(),
                })
            })
            .collect::<Vec<_>>();
        if scored.is_empty() {
            return Err(EvaluationError::EmptyInput(String::from("judged subjects")));
        }
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AnySymptomPolicy, SymptomThresholdPolicy};
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;
    use SymptomTag::*;

    fn long_text() -> String {
        "x".repeat(DEFAULT_MIN_TEXT_LEN + 1)
    }

    fn record(subject: &str, tags: &[&str]) -> PostRecord {
        PostRecord::new(subject, &long_text(), tags.iter().copied())
    }

    #[test]
    fn test_decided_at_post_k_freezes_delay() {
        let policy = SymptomThresholdPolicy::default();
        let mut state = SubjectState::Unjudged;
        let posts = [
            vec![Fatigue],
            vec![SleepIssues, NoSymptoms],
            vec![Worthlessness],
            vec![DepressedMood, Psychomotor],
            vec![SuicidalThoughts],
            vec![AppetiteChange],
        ];
        let mut delays = vec![];
        let mut decisions = vec![];
        for tags in posts {
            state = state.observe(tags, PostCounting::OneBased, &policy);
            let j = state.judgement().unwrap();
            delays.push(j.delay);
            decisions.push(j.decided);
        }
        assert_eq!(decisions, vec![false, false, false, true, true, true]);
        // the deciding post keeps the delay of the previous post
        assert_eq!(delays, vec![1, 2, 3, 3, 3, 3]);
        assert_eq!(state.judgement().unwrap().posts_seen, 6);
        assert_eq!(state.judgement().unwrap().evidence.len(), 7);
    }

    #[rstest]
    #[case(PostCounting::Legacy, vec![2, 3, 4])]
    #[case(PostCounting::OneBased, vec![1, 2, 3])]
    fn test_never_decided_tracks_last_post(
        #[case] counting: PostCounting,
        #[case] expected: Vec<usize>,
    ) {
        let policy = SymptomThresholdPolicy::default();
        let mut state = SubjectState::Unjudged;
        let mut delays = vec![];
        for tags in [vec![Fatigue], vec![Fatigue], vec![NoSymptoms]] {
            state = state.observe(tags, counting, &policy);
            delays.push(state.judgement().unwrap().delay);
            assert!(!state.judgement().unwrap().decided);
        }
        assert_eq!(delays, expected);
    }

    #[rstest]
    #[case(PostCounting::Legacy, 2)]
    #[case(PostCounting::OneBased, 1)]
    fn test_decided_at_first_post(#[case] counting: PostCounting, #[case] expected: usize) {
        let state = SubjectState::Unjudged.observe([Fatigue], counting, &AnySymptomPolicy);
        let j = state.judgement().unwrap();
        assert!(j.decided);
        assert_eq!(j.delay, expected);
        let state = state.observe([Anhedonia], counting, &AnySymptomPolicy);
        assert_eq!(state.judgement().unwrap().delay, expected);
    }

    #[derive(Debug)]
    struct OnlyExactlyTwo;
    impl RiskDecisionPolicy for OnlyExactlyTwo {
        fn decide(&self, evidence: &Evidence) -> bool {
            evidence.len() == 2
        }
    }

    #[test]
    fn test_decision_is_sticky() {
        let mut state = SubjectState::Unjudged;
        for tags in [vec![Fatigue], vec![Anhedonia], vec![SleepIssues]] {
            state = state.observe(tags, PostCounting::OneBased, &OnlyExactlyTwo);
        }
        let j = state.judgement().unwrap();
        assert!(j.decided);
        assert_eq!(j.delay, 1);
    }

    #[test]
    fn test_sentinel_never_adds_evidence() {
        fn sentinel_only(tags: Vec<SymptomTag>, repeats: u8) -> TestResult {
            let policy = SymptomThresholdPolicy::default();
            let mut state = SubjectState::Unjudged.observe(tags, PostCounting::Legacy, &policy);
            let before = state.judgement().unwrap().clone();
            for _ in 0..(repeats % 10) {
                state = state.observe([NoSymptoms], PostCounting::Legacy, &policy);
            }
            let after = state.judgement().unwrap();
            TestResult::from_bool(
                after.evidence == before.evidence && after.decided == before.decided,
            )
        }
        QuickCheck::new()
            .tests(1000)
            .quickcheck(sentinel_only as fn(Vec<SymptomTag>, u8) -> TestResult);
    }

    #[test]
    fn test_short_posts_are_ignored() {
        let mut accumulator = EvidenceAccumulator::new(SymptomThresholdPolicy::default());
        let short = PostRecord::new("a", &"x".repeat(DEFAULT_MIN_TEXT_LEN), ["FATIGUE"]);
        assert!(!accumulator.observe(&short));
        assert_eq!(accumulator.state("a"), &SubjectState::Unjudged);
        assert!(accumulator.observe(&record("a", &["FATIGUE"])));
        assert!(accumulator.state("a").is_judged());

        let mut lenient = EvidenceAccumulator::new(AnySymptomPolicy).min_text_len(0);
        assert!(lenient.observe(&PostRecord::new("b", "x", ["FATIGUE"])));
        assert!(!lenient.observe(&PostRecord::new("b", "", ["FATIGUE"])));
    }

    #[test]
    fn test_observe_post_positions() {
        let mut accumulator = EvidenceAccumulator::new(AnySymptomPolicy);
        let first = accumulator.observe_post("a", [NoSymptoms]);
        let second = accumulator.observe_post("a", [Fatigue]);
        let other = accumulator.observe_post("b", []);
        assert_eq!((first.position, second.position, other.position), (2, 3, 2));
        assert_eq!(second.tags, vec![Fatigue]);
        assert_eq!(accumulator.state("a").judgement().unwrap().delay, 2);
    }

    #[test]
    fn test_admits_counts_characters() {
        let accumulator = EvidenceAccumulator::new(AnySymptomPolicy).min_text_len(3);
        assert!(!accumulator.admits("éàü"));
        assert!(accumulator.admits("éàüö"));
    }

    #[test]
    fn test_subjects_are_independent() {
        let mut accumulator = EvidenceAccumulator::new(SymptomThresholdPolicy::default())
            .counting(PostCounting::OneBased);
        let records = vec![
            record("a", &["FATIGUE"]),
            record("b", &["ANHEDONIA", "UNKNOWN_TAG"]),
            record("a", &["SLEEP_ISSUES"]),
            record("b", &["NO_SYMPTOMS"]),
            record("b", &["FATIGUE"]),
        ];
        assert_eq!(accumulator.observe_all(&records), 5);
        let a = accumulator.state("a").judgement().unwrap();
        assert_eq!((a.posts_seen, a.delay, a.evidence.len()), (2, 2, 2));
        let b = accumulator.state("b").judgement().unwrap();
        assert_eq!((b.posts_seen, b.delay, b.evidence.len()), (3, 3, 2));
        let order: Vec<_> = accumulator.judged().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_scored_subjects_follow_golden_order() {
        let golden: GroundTruthStore =
            vec![("c", false), ("a", true), ("b", true)].into_iter().collect();
        let mut accumulator = EvidenceAccumulator::new(AnySymptomPolicy);
        accumulator.observe_all(&[record("a", &["FATIGUE"]), record("c", &["NO_SYMPTOMS"])]);
        let scored = accumulator
            .scored_subjects(&golden, MissingSubjectStrat::ReturnError)
            .unwrap();
        let subjects: Vec<_> = scored.iter().map(|s| s.subject.as_str()).collect();
        // `b` has no admitted post
        assert_eq!(subjects, vec!["c", "a"]);
        assert_eq!(
            scored[1].triple,
            ScoredTriple {
                gold: true,
                decision: true,
                delay: 2
            }
        );
        assert!(!scored[0].triple.decision);
    }

    #[test]
    fn test_missing_subject_strategy() {
        let golden: GroundTruthStore = vec![("a", true)].into_iter().collect();
        let mut accumulator = EvidenceAccumulator::new(AnySymptomPolicy);
        accumulator.observe_all(&[record("a", &["FATIGUE"]), record("ghost", &["FATIGUE"])]);
        assert_eq!(
            accumulator.scored_subjects(&golden, MissingSubjectStrat::ReturnError),
            Err(EvaluationError::MissingSubject(MissingSubjectError(String::from(
                "ghost"
            ))))
        );
        let scored = accumulator
            .scored_subjects(&golden, MissingSubjectStrat::Skip)
            .unwrap();
        assert_eq!(scored.len(), 1);
    }

    #[test]
    fn test_no_judged_subject_is_an_error() {
        let golden: GroundTruthStore = vec![("a", true)].into_iter().collect();
        let accumulator = EvidenceAccumulator::new(AnySymptomPolicy);
        assert_eq!(
            accumulator.scored_subjects(&golden, MissingSubjectStrat::Skip),
            Err(EvaluationError::EmptyInput(String::from("judged subjects")))
        );
    }

    #[rstest]
    #[case("skip", MissingSubjectStrat::Skip)]
    #[case("Error", MissingSubjectStrat::ReturnError)]
    #[case("returnError", MissingSubjectStrat::ReturnError)]
    fn test_parse_missing_subject_strat(#[case] raw: &str, #[case] expected: MissingSubjectStrat) {
        assert_eq!(raw.parse::<MissingSubjectStrat>().unwrap(), expected)
    }

    #[test]
    fn test_parse_post_counting() {
        assert_eq!("legacy".parse(), Ok(PostCounting::Legacy));
        assert_eq!("one-based".parse(), Ok(PostCounting::OneBased));
        assert!("zero".parse::<PostCounting>().is_err());
    }
}
