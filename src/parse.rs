//! Parsing a source file into an SWC module, plus span-to-text helpers.

use std::ops::Range;

use swc_core::common::{sync::Lrc, BytePos, FileName, SourceMap, Span, Spanned};
use swc_core::ecma::{
    ast::{EsVersion, Module},
    parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax},
};

pub struct ParsedModule {
    pub module: Module,
    /// Position of the first byte of the file inside the SWC source map.
    pub start_pos: BytePos,
}

/// Why a file could not be parsed; the file is then passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub offset: usize,
}

fn syntax_for(id: &str) -> Syntax {
    let path = strip_query(id);
    if path.ends_with(".ts") || path.ends_with(".mts") || path.ends_with(".cts") {
        Syntax::Typescript(TsSyntax {
            tsx: false,
            decorators: true,
            ..Default::default()
        })
    } else if path.ends_with(".tsx") {
        Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        })
    }
}

/// Bundler ids may carry `?query` suffixes.
pub fn strip_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

pub fn parse_module(source: &str, id: &str) -> Result<ParsedModule, ParseFailure> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Custom(id.to_string()).into(), source.to_string());
    let start_pos = fm.start_pos;
    let mut recovered = vec![];

    let failure = |span: Span, message: String| ParseFailure {
        message,
        offset: span.lo.0.saturating_sub(start_pos.0) as usize,
    };

    let module = parse_file_as_module(&fm, syntax_for(id), EsVersion::latest(), None, &mut recovered)
        .map_err(|e| failure(e.span(), e.kind().msg().to_string()))?;

    // Recovered errors still mean the AST may not match what the author wrote.
    if let Some(e) = recovered.first() {
        return Err(failure(e.span(), e.kind().msg().to_string()));
    }

    Ok(ParsedModule { module, start_pos })
}

/// Maps SWC spans back onto the original text.
#[derive(Debug, Clone, Copy)]
pub struct SourceText<'a> {
    pub text: &'a str,
    start_pos: BytePos,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str, start_pos: BytePos) -> Self {
        Self { text, start_pos }
    }

    pub fn range(&self, span: Span) -> Range<usize> {
        let lo = (span.lo.0 - self.start_pos.0) as usize;
        let hi = (span.hi.0 - self.start_pos.0) as usize;
        lo..hi
    }

    pub fn slice(&self, span: Span) -> &'a str {
        &self.text[self.range(span)]
    }

    /// The text strictly between the first and last byte of `span`, i.e. the
    /// body of a string or template literal without its delimiters.
    pub fn inner(&self, span: Span) -> &'a str {
        let r = self.range(span);
        if r.len() < 2 {
            return "";
        }
        &self.text[r.start + 1..r.end - 1]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use swc_core::ecma::ast::{Decl, ModuleItem, Stmt};

    use super::*;

    #[test]
    fn test_slices_follow_spans() {
        let src = "const a = `x: 1;`;";
        let parsed = parse_module(src, "a.js").unwrap();
        let text = SourceText::new(src, parsed.start_pos);
        let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) = &parsed.module.body[0] else {
            panic!("expected a var decl");
        };
        let init = var.decls[0].init.as_ref().unwrap();
        assert_eq!(text.slice(init.span()), "`x: 1;`");
        assert_eq!(text.inner(init.span()), "x: 1;");
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let err = parse_module("const = ;", "broken.ts").err().unwrap();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_tsx_and_query_ids() {
        assert!(parse_module("const a = <div />;", "App.tsx?v=123").is_ok());
        assert!(parse_module("const a = 1 as number;", "x.ts").is_ok());
        assert_eq!(strip_query("a.tsx?v=1"), "a.tsx");
    }
}
