//! Error types for the style transform.

use std::fmt;

/// Result type alias for transform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which splice position an identifier was about to occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A lowercase HTML tag such as `button`.
    HtmlTag,
    /// A JavaScript binding (component reference, variable, parameter).
    Binding,
    /// A variant dimension name, destructured next to generated locals.
    VariantDimension,
    /// A variant value name that becomes part of a CSS class.
    VariantValue,
    /// A class-name prefix from configuration.
    ClassPrefix,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HtmlTag => "HTML tag",
            Self::Binding => "identifier",
            Self::VariantDimension => "variant dimension",
            Self::VariantValue => "variant value",
            Self::ClassPrefix => "class prefix",
        };
        f.write_str(s)
    }
}

/// Errors that stop a file (or a session) from being processed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A name failed validation right before being spliced into generated code.
    #[error("{file}: unsafe {kind} `{identifier}` cannot be used in generated code")]
    UnsafeIdentifier {
        file: String,
        identifier: String,
        kind: IdentifierKind,
    },

    /// The host handed over plugin options that do not deserialize.
    #[error("invalid styled-static options: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// The configured class prefix is not a CSS identifier.
    #[error("class prefix `{0}` must match [A-Za-z][A-Za-z0-9_-]*")]
    InvalidPrefix(String),

    /// The source map could not be serialized.
    #[error("{file}: failed to serialize source map: {source}")]
    SourceMap {
        file: String,
        #[source]
        source: sourcemap::Error,
    },
}

impl Error {
    /// Create an unsafe identifier error.
    pub fn unsafe_identifier(
        file: impl Into<String>,
        identifier: impl Into<String>,
        kind: IdentifierKind,
    ) -> Self {
        Self::UnsafeIdentifier {
            file: file.into(),
            identifier: identifier.into(),
            kind,
        }
    }
}
