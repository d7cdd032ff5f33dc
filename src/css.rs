//! Wraps literal CSS text into rules. The text itself is never parsed; nesting
//! and prefixing are left to the host's CSS pipeline.

use crate::classify::ConstructKind;
use crate::extract::VariantConfig;
use crate::naming::variant_class;

/// `.{class} { … }`
pub fn class_rule(class: &str, css: &str) -> String {
    format!(".{class} {{ {} }}", css.trim())
}

/// `@keyframes {name} { … }`
pub fn keyframes_rule(name: &str, css: &str) -> String {
    format!("@keyframes {name} {{ {} }}", css.trim())
}

/// CSS for a tagged-template construct. Global styles are emitted as written.
pub fn construct_css(kind: &ConstructKind, class: Option<&str>, css: &str) -> String {
    match (kind, class) {
        (ConstructKind::GlobalStyle, _) | (_, None) => css.trim().to_string(),
        (ConstructKind::Keyframes, Some(name)) => keyframes_rule(name, css),
        (_, Some(class)) => class_rule(class, css),
    }
}

/// Base rule, then one rule per `(dimension, value)` in declaration order,
/// then one rule per compound variant using the conjunction of its selectors.
pub fn variant_css(base: &str, config: &VariantConfig) -> String {
    let mut rules = Vec::new();
    if let Some(css) = &config.base_css {
        rules.push(class_rule(base, css));
    }
    for (dim, values) in &config.variants {
        for (value, css) in values {
            rules.push(class_rule(&variant_class(base, dim.as_str(), value.as_str()), css));
        }
    }
    for compound in &config.compound_variants {
        let selector: String = compound
            .conditions
            .iter()
            .map(|(dim, value)| format!(".{}", variant_class(base, dim.as_str(), value.as_str())))
            .collect();
        rules.push(format!("{selector} {{ {} }}", compound.css.trim()));
    }
    rules.join("\n")
}
