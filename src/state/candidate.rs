//! Candidate domains produced by the generators
use std::fmt;

/// Which generator produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Fixed-length charset enumeration
    Short,

    /// Dictionary word list
    Word,
}

impl CandidateSource {
    /// Converts the source to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Word => "word",
        }
    }

    /// Parses a source from its string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(Self::Short),
            "word" => Some(Self::Word),
            _ => None,
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One domain to probe: `label.tld`
///
/// Candidates are ephemeral; only the cursors that produced them are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Full domain name (`label.tld`)
    pub domain: String,

    /// TLD without the leading dot
    pub tld: String,

    /// Label portion of the domain
    pub label: String,

    /// Label length in symbols
    pub length: u32,

    /// Generator that produced this candidate
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(label: impl Into<String>, tld: &str, source: CandidateSource) -> Self {
        let label = label.into();
        Self {
            domain: format!("{}.{}", label, tld),
            tld: tld.to_string(),
            length: label.chars().count() as u32,
            label,
            source,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.domain)
    }
}
