/*!
Selection of a single answer among several sampled completions of the same prompt. Answers
are compared through their canonical form: the set of their distinct elements, regardless of
order and repetitions. The original form of the first answer of a group represents it.
*/
use crate::metrics::{check_consistent_length, EvaluationError};
use crate::symptoms::SymptomTag;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static FINAL_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)final answer is:\s*\[([A-Z_,\s]*)\]")
        .expect("The final answer pattern should always compile")
});

/// Order and repetition insensitive key of an answer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalAnswer<T: Ord>(BTreeSet<T>);

impl<T: Ord + Clone> From<&[T]> for CanonicalAnswer<T> {
    fn from(value: &[T]) -> Self {
        Self(value.iter().cloned().collect())
    }
}

impl<T: Ord> CanonicalAnswer<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

/// Group of equivalent answers, in order of first occurrence.
struct Group<'a, T> {
    representative: &'a [T],
    count: usize,
    score: f64,
}

fn group_answers<'a, T, A>(answers: &'a [A], scores: Option<&[f64]>) -> Vec<Group<'a, T>>
where
    T: Ord + Clone,
    A: AsRef<[T]>,
{
    let mut index: BTreeMap<CanonicalAnswer<T>, usize> = BTreeMap::new();
    let mut groups: Vec<Group<'a, T>> = Vec::new();
    for (i, answer) in answers.iter().enumerate() {
        let answer = answer.as_ref();
        let score = scores.map_or(0.0, |s| s[i]);
        let canonical = CanonicalAnswer::from(answer);
        match index.get(&canonical) {
            Some(&g) => {
                groups[g].count += 1;
                groups[g].score += score;
            }
            None => {
                index.insert(canonical, groups.len());
                groups.push(Group {
                    representative: answer,
                    count: 1,
                    score,
                });
            }
        }
    }
    groups
}

/// Index of the first element strictly greater than all those before it.
fn first_argmax<I: IntoIterator<Item = f64>>(values: I) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => (),
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Returns the answer whose canonical form occurs the most often. On a tie, the group that
/// occurred first wins.
///
/// #Example
/// ```rust
/// use erisk_eval::find_majority_answer;
///
/// let answers = vec![vec!["a", "b"], vec!["b", "a"], vec!["c"], vec!["a", "b", "c"]];
/// assert_eq!(find_majority_answer(&answers).unwrap(), vec!["a", "b"]);
/// ```
pub fn find_majority_answer<T, A>(answers: &[A]) -> Result<Vec<T>, EvaluationError>
where
    T: Ord + Clone,
    A: AsRef<[T]>,
{
    if answers.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("answers")));
    }
    let groups = group_answers(answers, None);
    let best = first_argmax(groups.iter().map(|g| g.count as f64))
        .ok_or_else(|| EvaluationError::EmptyInput(String::from("answers")))?;
    Ok(groups[best].representative.to_vec())
}

/// Returns the answer whose canonical group has the largest sum of scores. On a tie, the
/// group that occurred first wins.
pub fn find_answer_with_largest_sum<T, A>(
    answers: &[A],
    scores: &[f64],
) -> Result<Vec<T>, EvaluationError>
where
    T: Ord + Clone,
    A: AsRef<[T]>,
{
    if answers.is_empty() || scores.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("answers and scores")));
    }
    check_consistent_length(answers, scores)?;
    let groups = group_answers(answers, Some(scores));
    let best = first_argmax(groups.iter().map(|g| g.score))
        .ok_or_else(|| EvaluationError::EmptyInput(String::from("answers and scores")))?;
    Ok(groups[best].representative.to_vec())
}

/// Returns the answer with the highest individual score. On a tie, the first one wins.
pub fn find_naive_answer<T, A>(answers: &[A], scores: &[f64]) -> Result<Vec<T>, EvaluationError>
where
    T: Clone,
    A: AsRef<[T]>,
{
    if answers.is_empty() || scores.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("answers and scores")));
    }
    check_consistent_length(answers, scores)?;
    let best = first_argmax(scores.iter().copied())
        .ok_or_else(|| EvaluationError::EmptyInput(String::from("scores")))?;
    Ok(answers[best].as_ref().to_vec())
}

/// First `n` completions and their scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subsample<'a, C> {
    pub n: usize,
    pub completions: &'a [C],
    pub scores: &'a [f64],
}

/// Keeps the first `n` completions. Completions are sampled in groups, so truncating keeps
/// the groups whole. If `n` exceeds the number of completions, everything is kept.
pub fn subsample_completions<'a, C>(
    completions: &'a [C],
    scores: &'a [f64],
    n: usize,
) -> Result<Subsample<'a, C>, EvaluationError> {
    check_consistent_length(completions, scores)?;
    let end = n.min(completions.len());
    Ok(Subsample {
        n,
        completions: &completions[..end],
        scores: &scores[..end],
    })
}

/// Extracts the symptom tags of the `final answer is: [..]` clause of a completion. Only the
/// clause is matched case insensitively: tags must be written exactly as their upper-case
/// names, anything else is dropped along with `NO_SYMPTOMS`. Without a final answer, the
/// returned list is empty.
///
/// #Example
/// ```rust
/// use erisk_eval::{extract_answer, SymptomTag};
///
/// let completion = "Step 1: ... The Final Answer is: [FATIGUE, SLEEP_ISSUES, sleep_issues, HAPPY]";
/// assert_eq!(
///     extract_answer(completion),
///     vec![SymptomTag::Fatigue, SymptomTag::SleepIssues]
/// );
/// ```
pub fn extract_answer(completion: &str) -> Vec<SymptomTag> {
    let Some(captures) = FINAL_ANSWER.captures(completion) else {
        tracing::trace!("no final answer found in completion");
        return Vec::new();
    };
    captures
        .get(1)
        .map_or("", |m| m.as_str())
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter_map(|tag| tag.parse::<SymptomTag>().ok())
        .filter(|tag| !tag.is_sentinel())
        .collect()
}

/// Answers selected by the three voting strategies over the first `n` completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotedAnswers {
    pub n: usize,
    pub naive: Vec<SymptomTag>,
    pub weighted: Vec<SymptomTag>,
    pub majority: Vec<SymptomTag>,
}

/// Subsamples the completions, extracts their answers and votes.
pub fn vote<S: AsRef<str>>(
    completions: &[S],
    scores: &[f64],
    n: usize,
) -> Result<VotedAnswers, EvaluationError> {
    let subsample = subsample_completions(completions, scores, n)?;
    let answers: Vec<Vec<SymptomTag>> = subsample
        .completions
        .iter()
        .map(|c| extract_answer(c.as_ref()))
        .collect();
    Ok(VotedAnswers {
        n,
        naive: find_naive_answer(&answers, subsample.scores)?,
        weighted: find_answer_with_largest_sum(&answers, subsample.scores)?,
        majority: find_majority_answer(&answers)?,
    })
}
