//! Repository subject identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Host prefixes accepted in front of `owner/repo`.
const GITHUB_PREFIXES: &[&str] = &["https://github.com/", "http://github.com/", "github.com/"];

/// The repository a diagram is generated for.
///
/// Both parts are lower-cased on construction, so two subjects that differ
/// only in case are the same cache key and the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject {
    owner: String,
    repository: String,
}

/// Reasons a subject string or pair could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectParseError {
    /// Owner part is empty.
    EmptyOwner,
    /// Repository part is empty.
    EmptyRepository,
    /// Input is not of the form `owner/repo`.
    InvalidFormat(String),
    /// A part contains a character GitHub does not allow in names.
    InvalidCharacter { part: String, character: char },
}

impl fmt::Display for SubjectParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOwner => write!(f, "Repository owner cannot be empty"),
            Self::EmptyRepository => write!(f, "Repository name cannot be empty"),
            Self::InvalidFormat(input) => {
                write!(f, "Expected 'owner/repo', got '{}'", input)
            }
            Self::InvalidCharacter { part, character } => {
                write!(f, "Invalid character '{}' in '{}'", character, part)
            }
        }
    }
}

impl std::error::Error for SubjectParseError {}

impl Subject {
    /// Create a subject from its owner and repository names.
    pub fn new(
        owner: impl AsRef<str>,
        repository: impl AsRef<str>,
    ) -> Result<Self, SubjectParseError> {
        let owner = normalize(owner.as_ref());
        let repository = normalize(repository.as_ref());

        if owner.is_empty() {
            return Err(SubjectParseError::EmptyOwner);
        }
        if repository.is_empty() {
            return Err(SubjectParseError::EmptyRepository);
        }
        validate_part(&owner)?;
        validate_part(&repository)?;

        Ok(Self { owner, repository })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }
}

fn normalize(part: &str) -> String {
    part.trim().to_lowercase()
}

fn validate_part(part: &str) -> Result<(), SubjectParseError> {
    if let Some(character) = part
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(SubjectParseError::InvalidCharacter {
            part: part.to_string(),
            character,
        });
    }
    Ok(())
}

impl FromStr for Subject {
    type Err = SubjectParseError;

    /// Parse `owner/repo`, optionally prefixed by a GitHub host and
    /// suffixed by `.git` or a trailing slash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        for prefix in GITHUB_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }
        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);

        match rest.split_once('/') {
            Some((owner, repository)) if !repository.contains('/') => {
                Self::new(owner, repository)
            }
            _ => Err(SubjectParseError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repository)
    }
}
