/*!
Decision policies. A policy looks at the evidence accumulated so far for a subject and says
whether the subject should be flagged as at-risk *now*.
*/
use crate::symptoms::{Evidence, SymptomTag};
use std::{collections::BTreeSet, fmt::Debug};

/// Pure decision function over an evidence set. Implementations must be total and free of
/// side effects: the accumulator calls them once per admitted post.
pub trait RiskDecisionPolicy: Debug {
    fn decide(&self, evidence: &Evidence) -> bool;
}

/// Screening heuristic: flag a subject once enough distinct symptoms have been observed and
/// at least one of them belongs to the core set. An empty core set disables the second
/// condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomThresholdPolicy {
    min_evidence: usize,
    core: BTreeSet<SymptomTag>,
}

impl SymptomThresholdPolicy {
    pub fn new<I: IntoIterator<Item = SymptomTag>>(min_evidence: usize, core: I) -> Self {
        Self {
            min_evidence,
            core: core.into_iter().filter(|t| !t.is_sentinel()).collect(),
        }
    }
    pub fn min_evidence(mut self, min_evidence: usize) -> Self {
        self.min_evidence = min_evidence;
        self
    }
    pub fn core<I: IntoIterator<Item = SymptomTag>>(mut self, core: I) -> Self {
        self.core = core.into_iter().filter(|t| !t.is_sentinel()).collect();
        self
    }
}

/// Five distinct symptoms, one of which is depressed mood or anhedonia.
impl Default for SymptomThresholdPolicy {
    fn default() -> Self {
        Self::new(5, [SymptomTag::DepressedMood, SymptomTag::Anhedonia])
    }
}

impl RiskDecisionPolicy for SymptomThresholdPolicy {
    fn decide(&self, evidence: &Evidence) -> bool {
        if evidence.len() < self.min_evidence {
            return false;
        }
        self.core.is_empty() || self.core.iter().any(|t| evidence.contains(t))
    }
}

/// Single-label decision: any evidence at all flags the subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnySymptomPolicy;

impl RiskDecisionPolicy for AnySymptomPolicy {
    #[inline]
    fn decide(&self, evidence: &Evidence) -> bool {
        !evidence.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;
    use SymptomTag::*;

    #[rstest]
    #[case(vec![DepressedMood, Fatigue, SleepIssues, Psychomotor], false)]
    #[case(vec![Fatigue, SleepIssues, Psychomotor, Worthlessness, CognitiveIssues], false)]
    #[case(vec![Anhedonia, SleepIssues, Psychomotor, Worthlessness, CognitiveIssues], true)]
    #[case(vec![DepressedMood, Anhedonia, Fatigue, Worthlessness, SuicidalThoughts, AppetiteChange], true)]
    #[case(vec![], false)]
    fn test_default_policy(#[case] tags: Vec<SymptomTag>, #[case] expected: bool) {
        let evidence: Evidence = tags.into_iter().collect();
        assert_eq!(SymptomThresholdPolicy::default().decide(&evidence), expected)
    }

    #[test]
    fn test_policy_is_configurable() {
        let evidence: Evidence = [Fatigue, SleepIssues].into_iter().collect();
        let policy = SymptomThresholdPolicy::default()
            .min_evidence(2)
            .core([Fatigue]);
        assert!(policy.decide(&evidence));
        let no_core = SymptomThresholdPolicy::new(2, Vec::<SymptomTag>::new());
        assert!(no_core.decide(&evidence));
        let sentinel_core = SymptomThresholdPolicy::new(1, [NoSymptoms]);
        assert!(sentinel_core.decide(&evidence));
    }

    #[test]
    fn test_any_symptom_policy() {
        assert!(!AnySymptomPolicy.decide(&Evidence::new()));
        assert!(AnySymptomPolicy.decide(&[Fatigue].into_iter().collect()));
        assert!(!AnySymptomPolicy.decide(&[NoSymptoms].into_iter().collect()));
    }

    #[test]
    fn test_default_policy_needs_a_core_symptom() {
        fn needs_core(tags: Vec<SymptomTag>) -> TestResult {
            let evidence: Evidence = tags.into_iter().collect();
            let decided = SymptomThresholdPolicy::default().decide(&evidence);
            let has_core = evidence.contains(&DepressedMood) || evidence.contains(&Anhedonia);
            TestResult::from_bool(decided == (has_core && evidence.len() >= 5))
        }
        QuickCheck::new()
            .tests(2000)
            .quickcheck(needs_core as fn(Vec<SymptomTag>) -> TestResult);
    }
}
