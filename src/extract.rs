//! Pulls literal CSS text and variant definitions out of the AST without
//! evaluating anything the author wrote.

use indexmap::IndexMap;
use swc_core::common::Spanned;
use swc_core::ecma::ast::*;

use crate::error::{IdentifierKind, Result};
use crate::imports::{ApiSymbol, ImportBindings};
use crate::parse::SourceText;
use crate::safe::{RenderTarget, SafeIdent};

/// Which API call produced a variant config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// `styledVariants`: renders a component.
    ComponentVariant,
    /// `cssVariants`: returns a class string.
    ClassVariant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundVariant {
    pub conditions: IndexMap<SafeIdent, SafeIdent>,
    pub css: String,
}

/// A parsed `styledVariants` / `cssVariants` argument.
///
/// Declaration order of dimensions and values is kept; it decides the order
/// of the emitted CSS rules and therefore the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantConfig {
    pub kind: VariantKind,
    pub component: Option<RenderTarget>,
    pub base_css: Option<String>,
    pub variants: IndexMap<SafeIdent, IndexMap<SafeIdent, String>>,
    pub default_variants: IndexMap<SafeIdent, SafeIdent>,
    pub compound_variants: Vec<CompoundVariant>,
}

impl VariantConfig {
    /// Number of enumerated `(dimension, value)` pairs.
    pub fn value_count(&self) -> usize {
        self.variants.values().map(IndexMap::len).sum()
    }

    /// Canonical text of everything that shapes the emitted CSS, used as the
    /// production hash input.
    pub fn content_key(&self) -> String {
        let mut key = self.base_css.clone().unwrap_or_default();
        for (dim, values) in &self.variants {
            key.push('\0');
            key.push_str(dim.as_str());
            for (value, css) in values {
                key.push('\u{1}');
                key.push_str(value.as_str());
                key.push('\u{1}');
                key.push_str(css);
            }
        }
        for compound in &self.compound_variants {
            key.push('\0');
            for (dim, value) in &compound.conditions {
                key.push_str(dim.as_str());
                key.push('=');
                key.push_str(value.as_str());
                key.push('\u{1}');
            }
            key.push_str(&compound.css);
        }
        key
    }
}

/// Body of a template literal without interpolations, as written.
pub fn template_text<'a>(text: &SourceText<'a>, tpl: &Tpl) -> Option<&'a str> {
    if !tpl.exprs.is_empty() {
        return None;
    }
    Some(text.inner(tpl.span))
}

/// Extracts CSS and variant definitions for one file.
pub struct Extractor<'a> {
    pub text: SourceText<'a>,
    pub bindings: &'a ImportBindings,
    pub file: &'a str,
    pub skip_level: log::Level,
}

impl<'a> Extractor<'a> {
    /// CSS text from a string literal, a plain template literal, or a
    /// `css`-tagged template. All three yield the same text for the same body.
    pub fn css_text(&self, expr: &Expr) -> Option<String> {
        match unwrap_expr(expr) {
            Expr::Lit(Lit::Str(s)) => Some(self.text.inner(s.span).to_string()),
            Expr::Tpl(tpl) => template_text(&self.text, tpl).map(str::to_string),
            Expr::TaggedTpl(tagged) => match &*tagged.tag {
                Expr::Ident(tag) if self.bindings.is(ApiSymbol::Css, tag.sym.as_ref()) => {
                    template_text(&self.text, &tagged.tpl).map(str::to_string)
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn skip(&self, what: &str, span: swc_core::common::Span) {
        let at = self.text.range(span).start;
        log::log!(
            self.skip_level,
            "{}: ignoring {what} at byte {at}: not a literal",
            self.file
        );
    }

    /// Parse the single object-literal argument of a variant call.
    pub fn variant_config(&self, kind: VariantKind, obj: &ObjectLit) -> Result<VariantConfig> {
        let mut config = VariantConfig {
            kind,
            component: None,
            base_css: None,
            variants: IndexMap::new(),
            default_variants: IndexMap::new(),
            compound_variants: Vec::new(),
        };

        // Variants first: defaults and compounds are checked against them.
        let entries = key_values(obj);
        if let Some((_, value)) = entries.iter().find(|(k, _)| k == "variants") {
            config.variants = self.variants(value)?;
        }

        for (key, value) in &entries {
            match key.as_str() {
                "component" if kind == VariantKind::ComponentVariant => {
                    config.component = self.render_target(value)?;
                    if config.component.is_none() {
                        self.skip("component", value.span());
                    }
                }
                "css" => {
                    config.base_css = self.css_text(value);
                    if config.base_css.is_none() {
                        self.skip("base css", value.span());
                    }
                }
                "defaultVariants" => {
                    config.default_variants = self.default_variants(value, &config.variants)?;
                }
                "compoundVariants" => {
                    config.compound_variants = self.compound_variants(value, &config.variants)?;
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// A string literal tag or an identifier component reference.
    pub fn render_target(&self, expr: &Expr) -> Result<Option<RenderTarget>> {
        Ok(match unwrap_expr(expr) {
            Expr::Lit(Lit::Str(s)) => Some(RenderTarget::Tag(SafeIdent::tag(
                self.file,
                &s.value.to_string(),
            )?)),
            Expr::Ident(i) => Some(RenderTarget::Component(SafeIdent::binding(
                self.file,
                i.sym.as_ref(),
            )?)),
            _ => None,
        })
    }

    fn variants(&self, expr: &Expr) -> Result<IndexMap<SafeIdent, IndexMap<SafeIdent, String>>> {
        let mut out = IndexMap::new();
        let Expr::Object(obj) = unwrap_expr(expr) else {
            self.skip("variants", expr.span());
            return Ok(out);
        };
        for (dim, values) in key_values(obj) {
            let dim = SafeIdent::new(self.file, &dim, IdentifierKind::VariantDimension)?;
            let Expr::Object(values) = unwrap_expr(values) else {
                self.skip("variant dimension", values.span());
                continue;
            };
            let mut parsed = IndexMap::new();
            for (value, css) in key_values(values) {
                let value = SafeIdent::new(self.file, &value, IdentifierKind::VariantValue)?;
                match self.css_text(css) {
                    Some(css) => {
                        parsed.insert(value, css);
                    }
                    None => self.skip("variant value", css.span()),
                }
            }
            out.insert(dim, parsed);
        }
        Ok(out)
    }

    fn default_variants(
        &self,
        expr: &Expr,
        variants: &IndexMap<SafeIdent, IndexMap<SafeIdent, String>>,
    ) -> Result<IndexMap<SafeIdent, SafeIdent>> {
        let mut out = IndexMap::new();
        let Expr::Object(obj) = unwrap_expr(expr) else {
            self.skip("defaultVariants", expr.span());
            return Ok(out);
        };
        for (dim, value) in key_values(obj) {
            let Some(value_name) = string_literal(value) else {
                self.skip("default variant", value.span());
                continue;
            };
            match known_pair(variants, &dim, &value_name) {
                Some((dim, value)) => {
                    out.insert(dim, value);
                }
                None => log::log!(
                    self.skip_level,
                    "{}: default variant {dim}={value_name} names no declared variant",
                    self.file
                ),
            }
        }
        Ok(out)
    }

    fn compound_variants(
        &self,
        expr: &Expr,
        variants: &IndexMap<SafeIdent, IndexMap<SafeIdent, String>>,
    ) -> Result<Vec<CompoundVariant>> {
        let mut out = Vec::new();
        let Expr::Array(arr) = unwrap_expr(expr) else {
            self.skip("compoundVariants", expr.span());
            return Ok(out);
        };
        'entries: for elem in arr.elems.iter().flatten() {
            let Expr::Object(obj) = unwrap_expr(&elem.expr) else {
                self.skip("compound variant", elem.expr.span());
                continue;
            };
            let mut conditions = IndexMap::new();
            let mut css = None;
            for (key, value) in key_values(obj) {
                if key == "css" {
                    css = self.css_text(value);
                    continue;
                }
                // A dropped condition would widen the rule, so drop the entry.
                let Some(value_name) = string_literal(value) else {
                    self.skip("compound variant condition", value.span());
                    continue 'entries;
                };
                let Some((dim, value)) = known_pair(variants, &key, &value_name) else {
                    log::log!(
                        self.skip_level,
                        "{}: compound variant condition {key}={value_name} names no declared variant",
                        self.file
                    );
                    continue 'entries;
                };
                conditions.insert(dim, value);
            }
            match css {
                Some(css) if !conditions.is_empty() => {
                    out.push(CompoundVariant { conditions, css })
                }
                _ => self.skip("compound variant", obj.span),
            }
        }
        Ok(out)
    }
}

/// Look up a `(dimension, value)` pair in the declared variants, returning the
/// validated names.
fn known_pair(
    variants: &IndexMap<SafeIdent, IndexMap<SafeIdent, String>>,
    dim: &str,
    value: &str,
) -> Option<(SafeIdent, SafeIdent)> {
    let (dim, values) = variants.get_key_value(dim)?;
    let (value, _) = values.get_key_value(value)?;
    Some((dim.clone(), value.clone()))
}

/// Static key/value pairs of an object literal. Spreads, methods, shorthand
/// and computed keys are not static and are skipped.
fn key_values(obj: &ObjectLit) -> Vec<(String, &Expr)> {
    obj.props
        .iter()
        .filter_map(|p| match p {
            PropOrSpread::Prop(p) => match &**p {
                Prop::KeyValue(kv) => prop_name(&kv.key).map(|k| (k, &*kv.value)),
                _ => None,
            },
            PropOrSpread::Spread(_) => None,
        })
        .collect()
}

fn prop_name(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(i) => Some(i.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        _ => None,
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match unwrap_expr(expr) {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
            .quasis
            .first()
            .and_then(|q| q.cooked.as_ref())
            .map(|c| c.to_string()),
        _ => None,
    }
}

/// Look through parentheses and TypeScript-only wrappers.
pub fn unwrap_expr(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(p) => unwrap_expr(&p.expr),
        Expr::TsAs(e) => unwrap_expr(&e.expr),
        Expr::TsConstAssertion(e) => unwrap_expr(&e.expr),
        Expr::TsSatisfies(e) => unwrap_expr(&e.expr),
        _ => expr,
    }
}
