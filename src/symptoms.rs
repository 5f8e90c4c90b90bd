/*!
Symptom tags produced by the post classifier. The set is closed: nine depression criteria and
a sentinel, `NO_SYMPTOMS`, which never counts as evidence.
*/
use enum_iterator::{all, Sequence};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    error::Error,
    fmt::{self, Display},
    str::FromStr,
};

/// A classification label attached to a single post.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymptomTag {
    DepressedMood,
    Anhedonia,
    AppetiteChange,
    SleepIssues,
    Psychomotor,
    Fatigue,
    Worthlessness,
    CognitiveIssues,
    SuicidalThoughts,
    /// Sentinel emitted when the classifier found nothing. Excluded from evidence.
    NoSymptoms,
}

impl SymptomTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepressedMood => "DEPRESSED_MOOD",
            Self::Anhedonia => "ANHEDONIA",
            Self::AppetiteChange => "APPETITE_CHANGE",
            Self::SleepIssues => "SLEEP_ISSUES",
            Self::Psychomotor => "PSYCHOMOTOR",
            Self::Fatigue => "FATIGUE",
            Self::Worthlessness => "WORTHLESSNESS",
            Self::CognitiveIssues => "COGNITIVE_ISSUES",
            Self::SuicidalThoughts => "SUICIDAL_THOUGHTS",
            Self::NoSymptoms => "NO_SYMPTOMS",
        }
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::NoSymptoms)
    }

    /// Every tag that can count as evidence, i.e. all of them but the sentinel.
    pub fn criteria() -> impl Iterator<Item = SymptomTag> {
        all::<SymptomTag>().filter(|t| !t.is_sentinel())
    }
}

impl Display for SymptomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParsingError(pub String);

impl Display for TagParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse `{}` into a `SymptomTag`", self.0)
    }
}

impl Error for TagParsingError {}

impl FromStr for SymptomTag {
    type Err = TagParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        all::<SymptomTag>()
            .find(|t| t.as_str() == trimmed)
            .ok_or_else(|| TagParsingError(String::from(s)))
    }
}

/// Parses the raw tag strings of a record. Unknown strings are dropped: the classifier output
/// is free text and anything outside the closed set is not evidence.
pub fn parse_tags<I, S>(raw: I) -> Vec<SymptomTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| match s.as_ref().parse::<SymptomTag>() {
            Ok(tag) => Some(tag),
            Err(e) => {
                tracing::trace!("ignoring tag: {}", e);
                None
            }
        })
        .collect()
}

/// Accumulated, deduplicated set of symptom tags observed for a subject. The sentinel can
/// never be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Evidence(BTreeSet<SymptomTag>);

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, returning `true` if the evidence grew.
    pub fn insert(&mut self, tag: SymptomTag) -> bool {
        if tag.is_sentinel() {
            return false;
        }
        self.0.insert(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &SymptomTag) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymptomTag> {
        self.0.iter()
    }
}

impl Extend<SymptomTag> for Evidence {
    fn extend<T: IntoIterator<Item = SymptomTag>>(&mut self, iter: T) {
        for tag in iter {
            self.insert(tag);
        }
    }
}

impl FromIterator<SymptomTag> for Evidence {
    fn from_iter<T: IntoIterator<Item = SymptomTag>>(iter: T) -> Self {
        let mut evidence = Evidence::new();
        evidence.extend(iter);
        evidence
    }
}

/// Displayed as a list, e.g. `[ANHEDONIA, FATIGUE]`.
impl Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "]")
    }
}
