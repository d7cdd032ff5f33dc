//! Replacement source text for classified constructs.
//!
//! Output is built with `format!`, and every interpolated value is either a
//! [`SafeIdent`], a [`SafeLiteral`] or a [`RenderTarget`]; raw author text is
//! only ever copied for the verbatim `attrs` argument.

use swc_core::common::Span;

use crate::classify::{ConstructKind, FoundConstruct, RenderAsMatch, VariantMatch};
use crate::error::Result;
use crate::extract::{VariantConfig, VariantKind};
use crate::naming::variant_class;
use crate::safe::{RenderTarget, SafeIdent, SafeLiteral};

/// Local alias of React's `createElement`.
pub const CREATE_ELEMENT: &str = "__ss_h";
/// Local alias of the runtime class merger.
pub const MERGE_CLASSES: &str = "__ss_cx";
/// Local alias of the runtime prop filter.
pub const FILTER_PROPS: &str = "__ss_filter";

const PURE: &str = "/*#__PURE__*/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReplacement {
    pub span: Span,
    pub text: String,
    /// Top-level declaration the replacement depends on.
    pub hoisted: Option<String>,
}

/// Which runtime helpers the generated code refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeUsage {
    pub create_element: bool,
    pub merge_classes: bool,
    pub filter_props: bool,
}

impl RuntimeUsage {
    /// Import statements for the helpers in use, `runtime` being the runtime
    /// module path.
    pub fn imports(&self, runtime: &str) -> Vec<String> {
        let mut out = Vec::new();
        if self.create_element {
            out.push(format!(
                "import {{ createElement as {CREATE_ELEMENT} }} from \"react\";"
            ));
        }
        let mut names = Vec::new();
        if self.merge_classes {
            names.push(format!("cx as {MERGE_CLASSES}"));
        }
        if self.filter_props {
            names.push(format!("filterProps as {FILTER_PROPS}"));
        }
        if !names.is_empty() {
            out.push(format!(
                "import {{ {} }} from {};",
                names.join(", "),
                SafeLiteral::string(runtime)
            ));
        }
        out
    }
}

/// How a variant config resolves selected values to classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStrategy {
    /// One `if`/`else if` chain per dimension.
    InlineBranches,
    /// One hoisted `dimension -> value -> suffix` table.
    LookupTable,
}

impl VariantStrategy {
    pub fn choose(config: &VariantConfig, threshold: usize) -> Self {
        if config.value_count() > threshold {
            VariantStrategy::LookupTable
        } else {
            VariantStrategy::InlineBranches
        }
    }
}

/// Variant dimensions reduced to literals: the only values generation reads.
struct VariantPlan {
    dims: Vec<DimPlan>,
}

struct DimPlan {
    name: SafeIdent,
    default: Option<SafeLiteral>,
    entries: Vec<ValuePlan>,
}

struct ValuePlan {
    value: SafeLiteral,
    /// The boolean or integer that names the same table key as `value`.
    non_string: Option<String>,
    /// `" base--dim-value"`
    suffix: SafeLiteral,
}

/// Largest integer `Number.isSafeInteger` accepts.
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// `true`, `false` and canonical safe integers are the non-string selections
/// whose property key is `value`.
fn non_string_key(value: &str) -> Option<String> {
    if value == "true" || value == "false" {
        return Some(value.to_string());
    }
    let n: i64 = value.parse().ok()?;
    (n.to_string() == value && n.unsigned_abs() <= MAX_SAFE_INTEGER).then(|| value.to_string())
}

impl VariantPlan {
    fn new(base: &str, config: &VariantConfig) -> Self {
        let dims = config
            .variants
            .iter()
            .map(|(dim, values)| DimPlan {
                name: dim.clone(),
                default: config
                    .default_variants
                    .get(dim.as_str())
                    .map(|v| SafeLiteral::string(v.as_str())),
                entries: values
                    .keys()
                    .map(|value| {
                        let suffix =
                            format!(" {}", variant_class(base, dim.as_str(), value.as_str()));
                        ValuePlan {
                            value: SafeLiteral::string(value.as_str()),
                            non_string: non_string_key(value.as_str()),
                            suffix: SafeLiteral::string(&suffix),
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { dims }
    }

    /// `{ color, size = "md"` without the closing brace.
    fn params(&self) -> String {
        let params: Vec<String> = self
            .dims
            .iter()
            .map(|d| match &d.default {
                Some(default) => format!("{} = {default}", d.name),
                None => d.name.to_string(),
            })
            .collect();
        params.join(", ")
    }
}

pub struct CodeGenerator<'a> {
    file: &'a str,
    threshold: usize,
    usage: RuntimeUsage,
    /// Lookup tables hoisted so far; numbers their names.
    tables: usize,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(file: &'a str, threshold: usize) -> Self {
        Self {
            file,
            threshold,
            usage: RuntimeUsage::default(),
            tables: 0,
        }
    }

    pub fn usage(&self) -> RuntimeUsage {
        self.usage
    }

    /// Replacement for a tagged-template construct. `class` is `None` only
    /// for global styles.
    pub fn construct(&mut self, found: &FoundConstruct, class: Option<&str>) -> GeneratedReplacement {
        let display = SafeLiteral::string(&found.variable_name);
        let text = match (&found.kind, class) {
            (ConstructKind::GlobalStyle, _) | (_, None) => "() => null".to_string(),
            (ConstructKind::ScopedClass | ConstructKind::Keyframes, Some(class)) => {
                SafeLiteral::string(class).to_string()
            }
            (ConstructKind::ElementStyle { tag }, Some(class)) => {
                let class = SafeLiteral::string(class);
                let render = self.render(&RenderTarget::Tag(tag.clone()), "props", None, &class);
                self.component(&render, &class.to_string(), &display)
            }
            (ConstructKind::AttrsElementStyle { tag, attrs }, Some(class)) => {
                let class = SafeLiteral::string(class);
                let render =
                    self.render(&RenderTarget::Tag(tag.clone()), "props", Some(attrs), &class);
                self.component(&render, &class.to_string(), &display)
            }
            (ConstructKind::Extension { base }, Some(class)) => {
                let class = SafeLiteral::string(class);
                let render =
                    self.render(&RenderTarget::Component(base.clone()), "props", None, &class);
                // Base classes first so the extension wins the cascade.
                let exposed = format!("{MERGE_CLASSES}({base}.className, {class})");
                self.component(&render, &exposed, &display)
            }
        };
        GeneratedReplacement {
            span: found.replace_span,
            text,
            hoisted: None,
        }
    }

    /// `(props) => createElement(target, { ...props, className })` where the
    /// construct's class comes before the caller's.
    fn render(
        &mut self,
        target: &RenderTarget,
        props: &str,
        attrs: Option<&str>,
        class: &dyn std::fmt::Display,
    ) -> String {
        self.usage.create_element = true;
        self.usage.merge_classes = true;
        let spread = match target {
            RenderTarget::Tag(_) => {
                self.usage.filter_props = true;
                format!("...{FILTER_PROPS}({props})")
            }
            RenderTarget::Component(_) => format!("...{props}"),
        };
        let attrs = attrs.map(|a| format!("...({a}), ")).unwrap_or_default();
        format!(
            "{CREATE_ELEMENT}({target}, {{ {attrs}{spread}, className: {MERGE_CLASSES}({class}, {props}.className) }})"
        )
    }

    /// A callable that also exposes its class and display name.
    fn component(&self, render: &str, class_expr: &str, display: &SafeLiteral) -> String {
        format!(
            "{PURE}Object.assign((props) => {render}, {{ className: {class_expr}, displayName: {display} }})"
        )
    }

    pub fn render_as(&mut self, found: &RenderAsMatch) -> GeneratedReplacement {
        let source_class = format!("{}.className", found.source);
        let render = self.render(&found.target, "props", None, &source_class);
        let display = SafeLiteral::string(&found.variable_name);
        GeneratedReplacement {
            span: found.replace_span,
            text: self.component(&render, &source_class, &display),
            hoisted: None,
        }
    }

    /// Variant resolver; `base` is the already-derived base class.
    pub fn variant(&mut self, found: &VariantMatch, base: &str) -> Result<GeneratedReplacement> {
        let config = &found.config;
        let plan = VariantPlan::new(base, config);
        let base_lit = SafeLiteral::string(base);

        let (lookups, hoisted) = match VariantStrategy::choose(config, self.threshold) {
            VariantStrategy::InlineBranches => (inline_branches(&plan), None),
            VariantStrategy::LookupTable => {
                // Redeclared `var`s share a variable name, never a table.
                let table = SafeIdent::binding(
                    self.file,
                    &format!("__ss_{}_variants_{}", found.variable_name, self.tables),
                )?;
                self.tables += 1;
                (table_lookups(&plan, &table), Some(table_declaration(&plan, &table)))
            }
        };

        let params = plan.params();
        let text = match config.kind {
            VariantKind::ClassVariant => {
                let params = if params.is_empty() {
                    "_ = {}".to_string()
                } else {
                    format!("{{ {params} }} = {{}}")
                };
                format!("({params}) => {{\n  let __ss_c = {base_lit};\n{lookups}  return __ss_c;\n}}")
            }
            VariantKind::ComponentVariant => {
                let target = config.component.clone().unwrap_or_else(RenderTarget::default_element);
                let render = self.render(&target, "__ss_props", None, &"__ss_c");
                let params = if params.is_empty() {
                    "...__ss_props".to_string()
                } else {
                    format!("{params}, ...__ss_props")
                };
                let display = SafeLiteral::string(&found.variable_name);
                format!(
                    "{PURE}Object.assign(({{ {params} }}) => {{\n  let __ss_c = {base_lit};\n{lookups}  return {render};\n}}, {{ className: {base_lit}, displayName: {display} }})"
                )
            }
        };

        Ok(GeneratedReplacement {
            span: found.replace_span,
            text,
            hoisted,
        })
    }
}

/// Matches exactly the selections the table lookup accepts for the same key.
fn inline_branches(plan: &VariantPlan) -> String {
    let mut out = String::new();
    for dim in &plan.dims {
        for (i, entry) in dim.entries.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "else if" };
            let name = &dim.name;
            let test = match &entry.non_string {
                Some(key) => format!("{name} === {} || {name} === {key}", entry.value),
                None => format!("{name} === {}", entry.value),
            };
            out.push_str(&format!("  {keyword} ({test}) __ss_c += {};\n", entry.suffix));
        }
    }
    out
}

/// Property access coerces the key to a string, so only selections whose
/// string form is their identity reach the table.
fn table_lookups(plan: &VariantPlan, table: &SafeIdent) -> String {
    let mut out = String::new();
    for dim in plan.dims.iter().filter(|d| !d.entries.is_empty()) {
        out.push_str(&format!(
            "  __ss_c += (typeof {name} === \"string\" || typeof {name} === \"boolean\" || Number.isSafeInteger({name})) && {table}.{name}[{name}] || \"\";\n",
            name = dim.name
        ));
    }
    out
}

/// Null-prototype literals, so inherited keys never resolve.
fn table_declaration(plan: &VariantPlan, table: &SafeIdent) -> String {
    let dims: Vec<String> = plan
        .dims
        .iter()
        .filter(|d| !d.entries.is_empty())
        .map(|d| {
            let entries: Vec<String> = d
                .entries
                .iter()
                .map(|e| format!("{}: {}", e.value, e.suffix))
                .collect();
            format!("{}: {{ __proto__: null, {} }}", d.name, entries.join(", "))
        })
        .collect();
    format!("const {table} = {{ __proto__: null, {} }};", dims.join(", "))
}
