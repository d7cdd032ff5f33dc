//! The single chokepoint for text that ends up inside generated code.
//!
//! Code generation is plain string building, so nothing reaches the output
//! unless it went through one of these wrappers: [`SafeIdent`] for names
//! matched against a strict pattern and [`SafeLiteral`] for quoted strings.

use std::borrow::Borrow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, IdentifierKind, Result};

static JS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"));
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*$").expect("tag pattern"));
static VARIANT_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("variant value pattern"));
static CSS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("css ident pattern"));

/// Words that cannot be used as a binding name in strict-mode modules.
const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Prefix of every name the generated code declares or imports.
pub const GENERATED_PREFIX: &str = "__ss_";

pub fn is_js_ident(s: &str) -> bool {
    JS_IDENT.is_match(s) && !RESERVED.contains(&s)
}

pub fn is_html_tag(s: &str) -> bool {
    HTML_TAG.is_match(s)
}

pub fn is_css_ident(s: &str) -> bool {
    CSS_IDENT.is_match(s)
}

/// A name that passed validation for the position it is spliced into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeIdent(String);

impl SafeIdent {
    /// Validate `name` as `kind`, failing the whole file otherwise.
    pub fn new(file: &str, name: &str, kind: IdentifierKind) -> Result<Self> {
        let ok = match kind {
            IdentifierKind::HtmlTag => is_html_tag(name),
            // Both end up as keys of generated object literals.
            IdentifierKind::Binding => is_js_ident(name) && name != "__proto__",
            // Destructured beside the generated locals and helper aliases.
            IdentifierKind::VariantDimension => {
                is_js_ident(name)
                    && name != "__proto__"
                    && name != "className"
                    && !name.starts_with(GENERATED_PREFIX)
            }
            IdentifierKind::VariantValue => VARIANT_VALUE.is_match(name) && name != "__proto__",
            IdentifierKind::ClassPrefix => is_css_ident(name),
        };
        if ok {
            Ok(Self(name.to_string()))
        } else {
            Err(Error::unsafe_identifier(file, name, kind))
        }
    }

    pub fn binding(file: &str, name: &str) -> Result<Self> {
        Self::new(file, name, IdentifierKind::Binding)
    }

    pub fn tag(file: &str, name: &str) -> Result<Self> {
        Self::new(file, name, IdentifierKind::HtmlTag)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SafeIdent {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A double-quoted JavaScript string literal with every special character
/// escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeLiteral(String);

impl SafeLiteral {
    pub fn string(value: &str) -> Self {
        // JSON string syntax is a subset of JS string literal syntax.
        let mut quoted = serde_json::Value::String(value.to_string()).to_string();
        if quoted.contains(['\u{2028}', '\u{2029}']) {
            quoted = quoted.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
        }
        Self(quoted)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render target of a generated component: a tag string or a component binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Tag(SafeIdent),
    Component(SafeIdent),
}

impl RenderTarget {
    /// `"div"`, rendered when a variant component names no target.
    pub fn default_element() -> Self {
        RenderTarget::Tag(SafeIdent("div".to_string()))
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderTarget::Tag(tag) => write!(f, "{}", SafeLiteral::string(tag.as_str())),
            RenderTarget::Component(ident) => write!(f, "{ident}"),
        }
    }
}
