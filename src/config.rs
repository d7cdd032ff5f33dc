//! Plugin options handed over by the host as JSON.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::safe;

/// Package name the authoring API is published under.
pub const PACKAGE_SOURCE: &str = "styled-static";

/// Build mode, which decides between readable and hashed class names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub mode: Mode,
    pub class_prefix: String,
    /// Variant configs enumerating more values than this get a hoisted lookup
    /// table instead of inline branches.
    pub variant_table_threshold: usize,
    /// Extra import sources treated as local builds of the package.
    pub dev_import_sources: Vec<String>,
    /// Production only: leave virtual modules empty and emit CSS assets at
    /// bundle finalization instead.
    pub extract_css: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            class_prefix: "ss".to_string(),
            variant_table_threshold: 4,
            dev_import_sources: vec!["../src/index".to_string(), "@/index".to_string()],
            extract_css: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Parse plugin options. An empty string yields the defaults.
    pub fn from_json(options: &str) -> Result<Self> {
        let config: Config = if options.trim().is_empty() {
            Config::default()
        } else {
            serde_json::from_str(options)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn production() -> Self {
        Self {
            mode: Mode::Production,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !safe::is_css_ident(&self.class_prefix) {
            return Err(Error::InvalidPrefix(self.class_prefix.clone()));
        }
        Ok(())
    }

    /// Returns the runtime import path when `source` is a recognized import
    /// of the authoring API.
    pub fn runtime_source_for(&self, source: &str) -> Option<String> {
        if source == PACKAGE_SOURCE {
            return Some(format!("{PACKAGE_SOURCE}/runtime"));
        }
        if self.dev_import_sources.iter().any(|s| s == source) {
            return Some(sibling_runtime(source));
        }
        None
    }

    /// Diagnostics for benign skips go to `debug` unless verbose was requested.
    pub(crate) fn skip_level(&self) -> log::Level {
        if self.verbose {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }
}

/// `../src/index` -> `../src/runtime`, `@/index.ts` -> `@/runtime`,
/// `./lib` -> `./lib/runtime`.
fn sibling_runtime(source: &str) -> String {
    match source.rsplit_once('/') {
        Some((dir, last)) if last == "index" || last.starts_with("index.") => {
            format!("{dir}/runtime")
        }
        _ => format!("{source}/runtime"),
    }
}
