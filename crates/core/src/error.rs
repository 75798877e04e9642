use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Empty,
    TooLong { max: usize, actual: usize },
    WrongType { expected: &'static str },
    Malformed(String),
    NotAllowed { value: String },
    Reserved,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("is required"),
            Self::Empty => f.write_str("must not be empty"),
            Self::TooLong { max, actual } => {
                write!(f, "is {actual} characters long (max {max})")
            }
            Self::WrongType { expected } => write!(f, "must be {expected}"),
            Self::Malformed(detail) => write!(f, "is malformed: {detail}"),
            Self::NotAllowed { value } => write!(f, "does not allow `{value}`"),
            Self::Reserved => f.write_str("is reserved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub problem: Problem,
}

/// Every field that failed validation, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, problem: Problem) -> Self {
        Self {
            issues: vec![FieldIssue {
                field: field.into(),
                problem,
            }],
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|i| i.field.as_str())
    }

    pub fn has_issue(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "`{}` {}", issue.field, issue.problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
