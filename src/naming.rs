//! Class names for found constructs.

use std::path::Path;

use crate::classify::{ConstructKind, FoundConstruct, VariantMatch};
use crate::config::{Config, Mode};
use crate::hash::short_hash;
use crate::parse::strip_query;

/// Hash length for element, class and keyframes names.
const CONSTRUCT_HASH_LEN: usize = 8;
/// Hash length for variant base classes.
const VARIANT_HASH_LEN: usize = 6;

pub struct ClassNamer<'a> {
    mode: Mode,
    prefix: &'a str,
    /// Sanitized file stem, only used for development names.
    file_base: String,
}

impl<'a> ClassNamer<'a> {
    pub fn new(config: &'a Config, source_id: &str) -> Self {
        let path = strip_query(source_id);
        let stem = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Self {
            mode: config.mode,
            prefix: &config.class_prefix,
            file_base: sanitize(stem),
        }
    }

    /// `None` for global styles, which are never scoped.
    pub fn construct(&self, found: &FoundConstruct) -> Option<String> {
        if found.kind == ConstructKind::GlobalStyle {
            return None;
        }
        Some(match self.mode {
            Mode::Development => self.readable(&found.variable_name),
            Mode::Production => {
                format!("{}-{}", self.prefix, short_hash(&found.css, CONSTRUCT_HASH_LEN))
            }
        })
    }

    pub fn variant_base(&self, found: &VariantMatch) -> String {
        match self.mode {
            Mode::Development => self.readable(&found.variable_name),
            Mode::Production => format!(
                "{}-{}",
                self.prefix,
                short_hash(&found.config.content_key(), VARIANT_HASH_LEN)
            ),
        }
    }

    fn readable(&self, variable_name: &str) -> String {
        format!("{}-{}-{}", self.prefix, sanitize(variable_name), self.file_base)
    }
}

/// Keep ASCII letters and digits only.
fn sanitize(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// `{base}--{dimension}-{value}`
pub fn variant_class(base: &str, dimension: &str, value: &str) -> String {
    format!("{base}--{dimension}-{value}")
}
