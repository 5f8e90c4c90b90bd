/*
 * This modules contains some quality of life structs and alias. Most importantly, it contains the
 * `EriskConfig` struct, which implements the default trait. This config can be passed to the
 * `evaluate_erisk_conf` function to simplify its arguments.
*/
use crate::accumulator::{
    EvidenceAccumulator, MissingSubjectStrat, PostCounting, DEFAULT_MIN_TEXT_LEN,
};
use crate::policy::{RiskDecisionPolicy, SymptomThresholdPolicy};
use either::Either as LeftOrRight;
use std::fmt::Display;

/// Values of `o` reported in the eRisk shared tasks.
pub const DEFAULT_OS: [f64; 2] = [5.0, 50.0];

/// Reasonable default configuration when evaluating an eRisk run.
pub type DefaultEriskConfig = EriskConfig<SymptomThresholdPolicy>;

#[derive(Clone, Debug, PartialEq)]
/// Config struct used to simplify the inputs of parameters to `evaluate_erisk_conf`. It
/// Implements the default trait.
pub struct EriskConfig<P: RiskDecisionPolicy> {
    /// Decides, from the accumulated evidence, if a subject is at risk.
    policy: P,
    /// Posts with at most this number of characters are not taken into account.
    min_text_len: usize,
    /// Every value of `o` gives one line of the final report. Must not be empty.
    os: Vec<f64>,
    /// What to do when a subject of the stream has no golden truth entry.
    missing_subjects: MissingSubjectStrat,
    /// Numbering of the posts of a subject. The legacy numbering starts at 2 and matches the
    /// delays of the reference eRisk evaluation.
    post_counting: PostCounting,
    /// Can we use multiple cores to compute the per-subject ERDE? It rarely pays off below a
    /// few hundred thousand subjects.
    parallel: bool,
}

impl DefaultEriskConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DefaultEriskConfig {
    fn default() -> Self {
        Self {
            policy: SymptomThresholdPolicy::default(),
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            os: DEFAULT_OS.to_vec(),
            missing_subjects: MissingSubjectStrat::Skip,
            post_counting: PostCounting::Legacy,
            parallel: false,
        }
    }
}

impl<P: RiskDecisionPolicy> EriskConfig<P> {
    pub fn policy(&self) -> &P {
        &self.policy
    }
    pub fn os(&self) -> &[f64] {
        &self.os
    }
    pub fn missing_subjects(&self) -> MissingSubjectStrat {
        self.missing_subjects
    }
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Fresh accumulator using the policy, filter and counting of this config.
    pub fn accumulator(&self) -> EvidenceAccumulator<P>
    where
        P: Clone,
    {
        EvidenceAccumulator::new(self.policy.clone())
            .min_text_len(self.min_text_len)
            .counting(self.post_counting)
    }
}

impl<P: RiskDecisionPolicy> Display for EriskConfig<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Decision policy: {:?}\n Minimum text length: {}\n Values of o: {:?}\n Strategy when a subject has no golden truth: {:?}\n Post counting: {:?}\n Using parallel computations: {}", self.policy, self.min_text_len, self.os, self.missing_subjects, self.post_counting, self.parallel);
        write!(f, "{}", string)
    }
}

impl<P, M> From<EriskConfigBuilder<P, M>> for EriskConfig<P>
where
    P: RiskDecisionPolicy,
    M: Into<MissingSubjectStrat>,
{
    fn from(value: EriskConfigBuilder<P, M>) -> Self {
        Self {
            policy: value.policy,
            min_text_len: value.min_text_len,
            os: value.os,
            missing_subjects: value.missing_subjects.either_into(),
            post_counting: value.post_counting,
            parallel: value.parallel,
        }
    }
}

/// This builder can be used to build and customize an `EriskConfig` stucture.
pub struct EriskConfigBuilder<P, M>
where
    P: RiskDecisionPolicy,
    M: Into<MissingSubjectStrat>,
{
    policy: P,
    min_text_len: usize,
    os: Vec<f64>,
    missing_subjects: LeftOrRight<M, MissingSubjectStrat>,
    post_counting: PostCounting,
    parallel: bool,
}

impl Default for EriskConfigBuilder<SymptomThresholdPolicy, MissingSubjectStrat> {
    fn default() -> Self {
        Self::new(SymptomThresholdPolicy::default())
    }
}

impl<P, M> EriskConfigBuilder<P, M>
where
    P: RiskDecisionPolicy,
    M: Into<MissingSubjectStrat>,
{
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            os: DEFAULT_OS.to_vec(),
            missing_subjects: LeftOrRight::Right(MissingSubjectStrat::Skip),
            post_counting: PostCounting::Legacy,
            parallel: false,
        }
    }
    /// Swaps the decision policy, keeping every other parameter.
    pub fn policy<Q: RiskDecisionPolicy>(self, policy: Q) -> EriskConfigBuilder<Q, M> {
        EriskConfigBuilder {
            policy,
            min_text_len: self.min_text_len,
            os: self.os,
            missing_subjects: self.missing_subjects,
            post_counting: self.post_counting,
            parallel: self.parallel,
        }
    }
    pub fn min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }
    pub fn os<I: IntoIterator<Item = f64>>(mut self, os: I) -> Self {
        self.os = os.into_iter().collect();
        self
    }
    pub fn missing_subjects(mut self, missing_subjects: M) -> Self {
        self.missing_subjects = LeftOrRight::Left(missing_subjects);
        self
    }
    pub fn post_counting(mut self, post_counting: PostCounting) -> Self {
        self.post_counting = post_counting;
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn build(self) -> EriskConfig<P> {
        EriskConfig::from(self)
    }
}
