//! Per-post failures and non-fatal diagnostics collected by the driver.

use std::fmt;

/// A post that cannot be emitted. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("no permalink entry for slug `{slug}`")]
    MissingPermalink { slug: String },

    #[error("post `{slug}` has no contents")]
    MissingContents { slug: String },

    #[error("no post title contains `{0}`")]
    NoMatchingPost(String),

    #[error("could not write `{slug}` to {path}: {reason}")]
    Write { slug: String, path: String, reason: String },

    #[error("multiple posts have titles containing `{needle}`: {candidates:?}")]
    AmbiguousTitle { needle: String, candidates: Vec<String> },
}

/// Warning raised while converting; the output is still written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No tag survived the allow-list. Flag the post for manual review.
    MissingTags { slug: String, title: String },
    /// A date could not be parsed. `context` is a slug or a file path.
    MalformedDate { context: String, key: String, value: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingTags { slug, title } => {
                write!(f, "{title} ({slug}) has no tags")
            }
            Diagnostic::MalformedDate { context, key, value } => {
                write!(f, "{context}: could not parse {key} '{value}'")
            }
        }
    }
}
