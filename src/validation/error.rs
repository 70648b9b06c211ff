use thiserror::Error;

/// Which structural rule a request broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Text is empty or whitespace only.
    Blank,
    /// Text exceeds the character limit.
    TooLong { max: usize, actual: usize },
    /// Collection has fewer items than required.
    TooFew { min: usize, actual: usize },
    /// Collection has more items than allowed.
    TooMany { max: usize, actual: usize },
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Blank => write!(f, "must not be empty or whitespace only"),
            Constraint::TooLong { max, actual } => {
                write!(f, "must be at most {max} characters, got {actual}")
            }
            Constraint::TooFew { min, actual } => {
                write!(f, "must contain at least {min} items, got {actual}")
            }
            Constraint::TooMany { max, actual } => {
                write!(f, "must contain at most {max} items, got {actual}")
            }
        }
    }
}

/// A request failed structural validation. The whole request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {constraint}")]
pub struct ValidationError {
    /// Offending field path, e.g. `pairs[3].passage`.
    pub field: String,
    /// The violated rule.
    pub constraint: Constraint,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }
}
