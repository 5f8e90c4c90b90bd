/*!
Golden truth of the eRisk collection: one binary label per subject. The text format is one
subject per line, `<subject id> <0|1>`, separated by whitespace.
*/
use ahash::AHashMap;
use std::{
    error::Error,
    fmt::{self, Display},
    io::{self, BufRead},
    str::FromStr,
};

#[derive(Debug)]
pub enum GroundTruthParseError {
    /// A line did not contain a subject id followed by `0` or `1`. Lines are 1-indexed.
    MalformedLine { line: usize, content: String },
    Io(io::Error),
}

impl Display for GroundTruthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine { line, content } => write!(
                f,
                "Malformed golden truth at line {}: `{}`. Expected `<subject> <0|1>`",
                line, content
            ),
            Self::Io(e) => write!(f, "Could not read the golden truth: {}", e),
        }
    }
}

impl Error for GroundTruthParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GroundTruthParseError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Read-only mapping from subject id to its gold label. Iteration follows insertion order,
/// which is the order of the golden truth file. Inserting an existing subject overwrites its
/// label but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthStore {
    subjects: Vec<(String, bool)>,
    index: AHashMap<String, usize>,
}

impl GroundTruthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, subject: S, gold: bool) {
        let subject = subject.into();
        match self.index.get(&subject) {
            Some(&i) => self.subjects[i].1 = gold,
            None => {
                self.index.insert(subject.clone(), self.subjects.len());
                self.subjects.push((subject, gold));
            }
        }
    }

    pub fn get(&self, subject: &str) -> Option<bool> {
        self.index.get(subject).map(|&i| self.subjects[i].1)
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.index.contains_key(subject)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Number of subjects with a positive gold label.
    pub fn positives(&self) -> usize {
        self.subjects.iter().filter(|(_, gold)| *gold).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.subjects.iter().map(|(s, g)| (s.as_str(), *g))
    }

    /// Reads the whitespace separated golden truth format. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, GroundTruthParseError> {
        let mut store = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (subject, gold) = parse_line(trimmed).ok_or_else(|| {
                GroundTruthParseError::MalformedLine {
                    line: i + 1,
                    content: String::from(trimmed),
                }
            })?;
            store.insert(subject, gold);
        }
        Ok(store)
    }
}

fn parse_line(line: &str) -> Option<(&str, bool)> {
    let mut parts = line.split_whitespace();
    let subject = parts.next()?;
    let gold = match parts.next()? {
        "1" => true,
        "0" => false,
        _ => return None,
    };
    match parts.next() {
        Some(_) => None,
        None => Some((subject, gold)),
    }
}

impl FromStr for GroundTruthStore {
    type Err = GroundTruthParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for GroundTruthStore {
    fn from_iter<T: IntoIterator<Item = (S, bool)>>(iter: T) -> Self {
        let mut store = Self::new();
        for (subject, gold) in iter {
            store.insert(subject, gold);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_golden_truth() {
        let content = "subject_a 1\nsubject_b 0\n\n  subject_c\t1  \n";
        let store: GroundTruthStore = content.parse().unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.positives(), 2);
        assert_eq!(store.get("subject_a"), Some(true));
        assert_eq!(store.get("subject_b"), Some(false));
        assert_eq!(store.get("subject_c"), Some(true));
        assert_eq!(store.get("subject_d"), None);
        let order: Vec<_> = store.iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["subject_a", "subject_b", "subject_c"]);
    }

    #[rstest]
    #[case("subject_a 2", 1)]
    #[case("subject_a", 1)]
    #[case("subject_a 1\nsubject_b yes", 2)]
    #[case("subject_a 1\n\nsubject_b 0 1", 3)]
    fn test_malformed_golden_truth(#[case] content: &str, #[case] expected_line: usize) {
        match content.parse::<GroundTruthStore>() {
            Err(GroundTruthParseError::MalformedLine { line, .. }) => {
                assert_eq!(line, expected_line)
            }
            other => panic!("expected a malformed line error, got {:?}", other),
        }
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let store: GroundTruthStore =
            vec![("a", true), ("b", false), ("a", false)].into_iter().collect();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(false));
        assert_eq!(store.iter().next(), Some(("a", false)));
    }
}
