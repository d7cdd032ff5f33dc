//! Matches top-level declarations against the bound API names.

use swc_core::common::{Span, Spanned};
use swc_core::ecma::ast::*;

use crate::error::Result;
use crate::extract::{template_text, unwrap_expr, Extractor, VariantConfig, VariantKind};
use crate::imports::ApiSymbol;
use crate::safe::{RenderTarget, SafeIdent};

/// The shape of one recognized tagged-template construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructKind {
    /// `styled.button`...``
    ElementStyle { tag: SafeIdent },
    /// `styled(Base)`...``
    Extension { base: SafeIdent },
    /// `styled.input.attrs({ ... })`...``; `attrs` is the argument's source
    /// text, copied verbatim.
    AttrsElementStyle { tag: SafeIdent, attrs: String },
    /// `css`...``
    ScopedClass,
    /// `createGlobalStyle`...``
    GlobalStyle,
    /// `keyframes`...``
    Keyframes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundConstruct {
    pub kind: ConstructKind,
    pub variable_name: String,
    /// Literal CSS body, without backticks.
    pub css: String,
    /// The initializer expression that gets replaced.
    pub replace_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMatch {
    pub config: VariantConfig,
    pub variable_name: String,
    pub replace_span: Span,
}

/// `withComponent(Target, Source)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderAsMatch {
    pub target: RenderTarget,
    pub source: SafeIdent,
    pub variable_name: String,
    pub replace_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Construct(FoundConstruct),
    Variant(VariantMatch),
    RenderAs(RenderAsMatch),
}

impl Classified {
    pub fn replace_span(&self) -> Span {
        match self {
            Classified::Construct(c) => c.replace_span,
            Classified::Variant(v) => v.replace_span,
            Classified::RenderAs(r) => r.replace_span,
        }
    }
}

/// Walk top-level (and exported) variable declarations in source order.
pub fn classify(module: &Module, ex: &Extractor<'_>) -> Result<Vec<Classified>> {
    let mut out = Vec::new();
    for item in &module.body {
        let var = match item {
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => var,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                decl: Decl::Var(var),
                ..
            })) => var,
            _ => continue,
        };
        if var.declare {
            continue;
        }
        for decl in &var.decls {
            let (Some(name), Some(init)) = (decl.name.as_ident(), &decl.init) else {
                continue;
            };
            let variable_name = name.id.sym.to_string();
            if let Some(found) = classify_init(init, variable_name, ex)? {
                out.push(found);
            }
        }
    }
    Ok(out)
}

fn classify_init(init: &Expr, variable_name: String, ex: &Extractor<'_>) -> Result<Option<Classified>> {
    let replace_span = init.span();
    match init {
        Expr::TaggedTpl(tagged) => {
            let Some(kind) = tagged_kind(&tagged.tag, ex)? else {
                return Ok(None);
            };
            let Some(css) = template_text(&ex.text, &tagged.tpl) else {
                log::warn!(
                    "{}: `{variable_name}` uses ${{}} interpolation, which is not compiled; left as is",
                    ex.file
                );
                return Ok(None);
            };
            Ok(Some(Classified::Construct(FoundConstruct {
                kind,
                variable_name,
                css: css.to_string(),
                replace_span,
            })))
        }
        Expr::Call(call) => {
            let Callee::Expr(callee) = &call.callee else {
                return Ok(None);
            };
            let Expr::Ident(callee) = &**callee else {
                return Ok(None);
            };
            let variant_kind = match ex.bindings.symbol_for_local(callee.sym.as_ref()) {
                Some(ApiSymbol::StyledVariants) => VariantKind::ComponentVariant,
                Some(ApiSymbol::CssVariants) => VariantKind::ClassVariant,
                Some(ApiSymbol::WithComponent) => {
                    return render_as(call, variable_name, replace_span, ex);
                }
                _ => return Ok(None),
            };
            let args = plain_args(call);
            let [arg] = args.as_slice() else {
                return Ok(None);
            };
            let Expr::Object(obj) = unwrap_expr(arg) else {
                return Ok(None);
            };
            let config = ex.variant_config(variant_kind, obj)?;
            Ok(Some(Classified::Variant(VariantMatch {
                config,
                variable_name,
                replace_span,
            })))
        }
        _ => Ok(None),
    }
}

/// Decide what a template tag means, in priority order.
fn tagged_kind(tag: &Expr, ex: &Extractor<'_>) -> Result<Option<ConstructKind>> {
    let b = ex.bindings;
    match tag {
        // styled.tag
        Expr::Member(member) => {
            let Some(tag_name) = styled_member(member, ex) else {
                return Ok(None);
            };
            Ok(Some(ConstructKind::ElementStyle {
                tag: SafeIdent::tag(ex.file, tag_name)?,
            }))
        }
        Expr::Call(call) => {
            let Callee::Expr(callee) = &call.callee else {
                return Ok(None);
            };
            let args = plain_args(call);
            match &**callee {
                // styled.tag.attrs({...})
                Expr::Member(attrs) => {
                    let is_attrs = matches!(&attrs.prop, MemberProp::Ident(p) if p.sym.as_ref() == "attrs");
                    let Expr::Member(styled) = &*attrs.obj else {
                        return Ok(None);
                    };
                    let Some(tag_name) = styled_member(styled, ex).filter(|_| is_attrs) else {
                        return Ok(None);
                    };
                    let [arg] = args.as_slice() else {
                        return Ok(None);
                    };
                    if !matches!(unwrap_expr(arg), Expr::Object(_)) {
                        return Ok(None);
                    }
                    Ok(Some(ConstructKind::AttrsElementStyle {
                        tag: SafeIdent::tag(ex.file, tag_name)?,
                        attrs: ex.text.slice(arg.span()).to_string(),
                    }))
                }
                // styled(Base)
                Expr::Ident(callee) if b.is(ApiSymbol::Styled, callee.sym.as_ref()) => {
                    let [Expr::Ident(base)] = args.as_slice() else {
                        return Ok(None);
                    };
                    Ok(Some(ConstructKind::Extension {
                        base: SafeIdent::binding(ex.file, base.sym.as_ref())?,
                    }))
                }
                _ => Ok(None),
            }
        }
        Expr::Ident(ident) => Ok(match b.symbol_for_local(ident.sym.as_ref()) {
            Some(ApiSymbol::Css) => Some(ConstructKind::ScopedClass),
            Some(ApiSymbol::CreateGlobalStyle) => Some(ConstructKind::GlobalStyle),
            Some(ApiSymbol::Keyframes) => Some(ConstructKind::Keyframes),
            _ => None,
        }),
        _ => Ok(None),
    }
}

/// `styled.<name>` -> `name`
fn styled_member<'m>(member: &'m MemberExpr, ex: &Extractor<'_>) -> Option<&'m str> {
    let Expr::Ident(obj) = &*member.obj else {
        return None;
    };
    if !ex.bindings.is(ApiSymbol::Styled, obj.sym.as_ref()) {
        return None;
    }
    match &member.prop {
        MemberProp::Ident(prop) => Some(prop.sym.as_ref()),
        _ => None,
    }
}

/// Call arguments, or nothing at all if any argument is spread.
fn plain_args(call: &CallExpr) -> Vec<&Expr> {
    if call.args.iter().any(|a| a.spread.is_some()) {
        return Vec::new();
    }
    call.args.iter().map(|a| &*a.expr).collect()
}

fn render_as(
    call: &CallExpr,
    variable_name: String,
    replace_span: Span,
    ex: &Extractor<'_>,
) -> Result<Option<Classified>> {
    let args = plain_args(call);
    let [target, source] = args.as_slice() else {
        return Ok(None);
    };
    let Expr::Ident(source) = unwrap_expr(source) else {
        return Ok(None);
    };
    let source = SafeIdent::binding(ex.file, source.sym.as_ref())?;
    let Some(target) = ex.render_target(target)? else {
        return Ok(None);
    };
    Ok(Some(Classified::RenderAs(RenderAsMatch {
        target,
        source,
        variable_name,
        replace_span,
    })))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Config;
    use crate::error::{Error, IdentifierKind};
    use crate::imports::ImportBindings;
    use crate::parse::{parse_module, SourceText};

    const IMPORT: &str = "import { styled, css, createGlobalStyle, keyframes, styledVariants, cssVariants, withComponent } from \"styled-static\";\n";

    fn classify_src(body: &str) -> Result<Vec<Classified>> {
        let src = format!("{IMPORT}{body}");
        let parsed = parse_module(&src, "src/Button.tsx").unwrap();
        let bindings = ImportBindings::collect(&parsed.module, &Config::default());
        let ex = Extractor {
            text: SourceText::new(&src, parsed.start_pos),
            bindings: &bindings,
            file: "src/Button.tsx",
            skip_level: log::Level::Debug,
        };
        classify(&parsed.module, &ex)
    }

    fn kinds(found: &[Classified]) -> Vec<ConstructKind> {
        found
            .iter()
            .filter_map(|c| match c {
                Classified::Construct(c) => Some(c.kind.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_each_tagged_construct_kind() {
        let found = classify_src(
            r#"const Button = styled.button`padding: 1rem;`;
export const Primary = styled(Button)`background: blue;`;
let Input = styled.input.attrs({ type: "text" })`border: 0;`;
var active = css`color: red;`;
const Global = createGlobalStyle`body { margin: 0; }`;
const fade = keyframes`from { opacity: 0; }`;
"#,
        )
        .unwrap();
        let tag = |t: &str| SafeIdent::tag("f", t).unwrap();
        assert_eq!(
            kinds(&found),
            vec![
                ConstructKind::ElementStyle { tag: tag("button") },
                ConstructKind::Extension {
                    base: SafeIdent::binding("f", "Button").unwrap()
                },
                ConstructKind::AttrsElementStyle {
                    tag: tag("input"),
                    attrs: r#"{ type: "text" }"#.to_string()
                },
                ConstructKind::ScopedClass,
                ConstructKind::GlobalStyle,
                ConstructKind::Keyframes,
            ]
        );
        let Classified::Construct(first) = &found[0] else {
            panic!("expected a construct");
        };
        assert_eq!(first.variable_name, "Button");
        assert_eq!(first.css, "padding: 1rem;");
    }

    #[test]
    fn test_aliases_are_honored() {
        let src = "import { styled as s, css as c } from \"styled-static\";\nconst A = s.div`x: 1;`;\nconst b = c`y: 2;`;\nconst d = styled.div`z: 3;`;";
        let parsed = parse_module(src, "a.js").unwrap();
        let bindings = ImportBindings::collect(&parsed.module, &Config::default());
        let ex = Extractor {
            text: SourceText::new(src, parsed.start_pos),
            bindings: &bindings,
            file: "a.js",
            skip_level: log::Level::Debug,
        };
        let found = classify(&parsed.module, &ex).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unrelated_code_passes_through() {
        let found = classify_src(
            r#"const x = other`a`;
const y = styled;
const z = foo(styled.div);
function f() { const inner = css`nested: 1;`; }
const { a } = styled.div`destructured: 1;`;
const w = css`color: ${color};`;
"#,
        )
        .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_invalid_tag_is_fatal() {
        let err = classify_src("const B = styled.Button`x: 1;`;").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsafeIdentifier { kind: IdentifierKind::HtmlTag, ref identifier, .. } if identifier == "Button"
        ));
    }

    #[test]
    fn test_variants_and_render_as() {
        let found = classify_src(
            r#"const V = styledVariants({ component: "a", variants: { size: { sm: "x" } } });
const c = cssVariants({ css: "y", variants: {} });
const Link = withComponent("a", V);
const Routed = withComponent(RouterLink, V);
const skipped = withComponent(V);
"#,
        )
        .unwrap();
        assert_eq!(found.len(), 4);
        assert!(matches!(&found[0], Classified::Variant(v) if v.config.kind == VariantKind::ComponentVariant));
        assert!(matches!(&found[1], Classified::Variant(v) if v.config.kind == VariantKind::ClassVariant));
        let Classified::RenderAs(link) = &found[3] else {
            panic!("expected a render-as match");
        };
        assert_eq!(link.source.as_str(), "V");
        assert_eq!(link.target.to_string(), "RouterLink");
    }
}
