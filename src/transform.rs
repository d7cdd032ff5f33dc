//! The per-file pass: parse, classify, name, register, generate, splice.

use std::ops::Range;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sourcemap::{SourceMap, SourceMapBuilder};
use swc_core::ecma::ast::{Expr, Lit, Module, ModuleItem, Stmt};

use crate::classify::{classify, Classified};
use crate::codegen::{CodeGenerator, GeneratedReplacement};
use crate::config::{Config, PACKAGE_SOURCE};
use crate::css::{construct_css, variant_css};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::imports::ImportBindings;
use crate::naming::ClassNamer;
use crate::parse::{parse_module, ParseFailure, SourceText};
use crate::registry::CssRegistry;
use crate::safe::SafeLiteral;

/// Where a file ended up. Only [`TransformOutcome::Transformed`] changes the
/// file; every other outcome means "pass the input through".
#[derive(Debug)]
pub enum TransformOutcome {
    /// No import of the authoring API.
    NotApplicable,
    ParseFailed(ParseFailure),
    NoConstructs,
    Transformed(TransformOutput),
}

impl TransformOutcome {
    pub fn into_output(self) -> Option<TransformOutput> {
        match self {
            TransformOutcome::Transformed(output) => Some(output),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct TransformOutput {
    pub code: String,
    pub map: SourceMap,
    /// Import form of every CSS module the file now owns, in emission order.
    pub css_modules: Vec<String>,
    file: String,
}

impl TransformOutput {
    pub fn map_json(&self) -> Result<String> {
        let mut bytes = Vec::new();
        self.map.to_writer(&mut bytes).map_err(|source| Error::SourceMap {
            file: self.file.clone(),
            source,
        })?;
        // The writer only ever produces JSON.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// `//# sourceMappingURL=data:...` line carrying the whole map.
    pub fn inline_map_comment(&self) -> Result<String> {
        let json = self.map_json()?;
        Ok(format!(
            "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
            STANDARD.encode(json)
        ))
    }
}

/// Text check before paying for a parse.
fn mentions_api(source: &str, config: &Config) -> bool {
    source.contains(PACKAGE_SOURCE) || config.dev_import_sources.iter().any(|s| source.contains(s.as_str()))
}

/// Transform one file. `Err` is reserved for fatal problems (unsafe
/// identifiers); everything recoverable is an outcome.
pub fn transform_file(
    source: &str,
    id: &str,
    config: &Config,
    registry: &CssRegistry,
) -> Result<TransformOutcome> {
    if !mentions_api(source, config) {
        registry.replace_file(id, Vec::new());
        return Ok(TransformOutcome::NotApplicable);
    }

    let parsed = match parse_module(source, id) {
        Ok(parsed) => parsed,
        Err(failure) => {
            log::warn!(
                "{id}: parse error at byte {}: {}; passing file through",
                failure.offset,
                failure.message
            );
            return Ok(TransformOutcome::ParseFailed(failure));
        }
    };

    let bindings = ImportBindings::collect(&parsed.module, config);
    let Some(runtime) = bindings.runtime_source() else {
        log::log!(config.skip_level(), "{id}: no styled-static import");
        registry.replace_file(id, Vec::new());
        return Ok(TransformOutcome::NotApplicable);
    };

    let text = SourceText::new(source, parsed.start_pos);
    let extractor = Extractor {
        text,
        bindings: &bindings,
        file: id,
        skip_level: config.skip_level(),
    };
    let found = classify(&parsed.module, &extractor)?;
    if found.is_empty() {
        log::log!(config.skip_level(), "{id}: no constructs found");
        registry.replace_file(id, Vec::new());
        return Ok(TransformOutcome::NoConstructs);
    }

    let namer = ClassNamer::new(config, id);
    let mut codegen = CodeGenerator::new(id, config.variant_table_threshold);
    let mut replacements = Vec::with_capacity(found.len());
    let mut css_modules = Vec::new();
    for item in &found {
        match item {
            Classified::Construct(construct) => {
                let class = namer.construct(construct);
                css_modules.push(construct_css(&construct.kind, class.as_deref(), &construct.css));
                replacements.push(codegen.construct(construct, class.as_deref()));
            }
            Classified::Variant(variant) => {
                let base = namer.variant_base(variant);
                let css = variant_css(&base, &variant.config);
                if !css.is_empty() {
                    css_modules.push(css);
                }
                replacements.push(codegen.variant(variant, &base)?);
            }
            Classified::RenderAs(render_as) => replacements.push(codegen.render_as(render_as)),
        }
    }

    // Nothing can fail past this point, so the registry never holds a
    // half-transformed file.
    let css_ids = registry.replace_file(id, css_modules);

    let mut preamble: Vec<String> = codegen.usage().imports(runtime);
    preamble.extend(
        css_ids
            .iter()
            .map(|css_id| format!("import {};", SafeLiteral::string(css_id))),
    );
    preamble.extend(replacements.iter().filter_map(|r| r.hoisted.clone()));

    let insert_at = preamble_offset(&parsed.module, &text);
    let mut writer = MappedWriter::new(id, source);
    let mut cursor = 0;
    let mut spliced = false;
    for replacement in &replacements {
        let range = text.range(replacement.span);
        if !spliced && insert_at <= range.start {
            writer.copy(cursor..insert_at);
            writer.insert(&preamble);
            cursor = insert_at;
            spliced = true;
        }
        writer.copy(cursor..range.start);
        writer.replace(replacement, range.start);
        cursor = range.end;
    }
    if !spliced {
        writer.copy(cursor..insert_at);
        writer.insert(&preamble);
        cursor = insert_at;
    }
    writer.copy(cursor..source.len());

    log::debug!("{id}: compiled {} constructs", replacements.len());
    let (code, map) = writer.finish();
    Ok(TransformOutcome::Transformed(TransformOutput {
        code,
        map,
        css_modules: css_ids,
        file: id.to_string(),
    }))
}

/// Byte offset right after the leading directive prologue (`"use client";`),
/// which has to stay first in the file.
fn preamble_offset(module: &Module, text: &SourceText<'_>) -> usize {
    // A hashbang must stay on the first line.
    let mut offset = match module.shebang {
        Some(_) => text.text.find('\n').map_or(text.text.len(), |i| i + 1),
        None => 0,
    };
    let mut directives = false;
    for item in &module.body {
        let ModuleItem::Stmt(Stmt::Expr(stmt)) = item else {
            break;
        };
        if !matches!(&*stmt.expr, Expr::Lit(Lit::Str(_))) {
            break;
        }
        offset = text.range(stmt.span).end;
        directives = true;
    }
    if !directives {
        return offset;
    }
    // Keep the rest of the directive's line with it.
    let rest = &text.text[offset..];
    offset + rest.find('\n').map_or(rest.len(), |i| i + 1)
}

/// Builds the output text and its source map side by side.
struct MappedWriter<'a> {
    original: &'a str,
    /// Byte offset of every original line start.
    line_starts: Vec<usize>,
    out: String,
    line: u32,
    col: u32,
    builder: SourceMapBuilder,
    source_id: u32,
}

impl<'a> MappedWriter<'a> {
    fn new(file: &str, original: &'a str) -> Self {
        let mut builder = SourceMapBuilder::new(Some(file));
        let source_id = builder.add_source(file);
        builder.set_source_contents(source_id, Some(original));
        let line_starts = std::iter::once(0)
            .chain(original.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            original,
            line_starts,
            out: String::with_capacity(original.len() + 512),
            line: 0,
            col: 0,
            builder,
            source_id,
        }
    }

    /// Original line and UTF-16 column of a byte offset.
    fn original_position(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let col: usize = self.original[self.line_starts[line]..offset]
            .chars()
            .map(char::len_utf16)
            .sum();
        (line as u32, col as u32)
    }

    fn map_to(&mut self, offset: usize) {
        let (src_line, src_col) = self.original_position(offset);
        self.builder.add_raw(
            self.line,
            self.col,
            src_line,
            src_col,
            Some(self.source_id),
            None,
            false,
        );
    }

    fn push(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += c.len_utf16() as u32;
            }
        }
        self.out.push_str(text);
    }

    /// Copy original text, mapping its start and every line start in it.
    fn copy(&mut self, range: Range<usize>) {
        let original = self.original;
        let mut offset = range.start;
        for piece in original[range].split_inclusive('\n') {
            self.map_to(offset);
            self.push(piece);
            offset += piece.len();
        }
    }

    /// Unmapped generated lines.
    fn insert(&mut self, lines: &[String]) {
        for line in lines {
            self.push(line);
            self.push("\n");
        }
    }

    fn replace(&mut self, replacement: &GeneratedReplacement, original_offset: usize) {
        self.map_to(original_offset);
        self.push(&replacement.text);
    }

    fn finish(self) -> (String, SourceMap) {
        (self.out, self.builder.into_sourcemap())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::registry::virtual_id;

    fn run(source: &str) -> TransformOutput {
        let registry = CssRegistry::new();
        transform_file(source, "src/App.tsx", &Config::default(), &registry)
            .unwrap()
            .into_output()
            .expect("file should be transformed")
    }

    #[test]
    fn test_not_applicable_without_import() {
        let registry = CssRegistry::new();
        let outcome =
            transform_file("const a = 1;", "src/a.ts", &Config::default(), &registry).unwrap();
        assert!(matches!(outcome, TransformOutcome::NotApplicable));

        let outcome = transform_file(
            "// styled-static is great\nconst a = 1;",
            "src/a.ts",
            &Config::default(),
            &registry,
        )
        .unwrap();
        assert!(matches!(outcome, TransformOutcome::NotApplicable));
    }

    #[test]
    fn test_no_constructs_clears_previous_entries() {
        let registry = CssRegistry::new();
        let config = Config::default();
        let with = "import { css } from \"styled-static\";\nconst a = css`color: red;`;\n";
        transform_file(with, "src/a.ts", &config, &registry).unwrap();
        assert_eq!(registry.len(), 1);

        let without = "import { css } from \"styled-static\";\nconst a = \"plain\";\n";
        let outcome = transform_file(without, "src/a.ts", &config, &registry).unwrap();
        assert!(matches!(outcome, TransformOutcome::NoConstructs));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_parse_failure_is_an_outcome() {
        let registry = CssRegistry::new();
        let outcome = transform_file(
            "import { css } from \"styled-static\";\nconst = ;",
            "src/a.ts",
            &Config::default(),
            &registry,
        )
        .unwrap();
        assert!(matches!(outcome, TransformOutcome::ParseFailed(_)));
    }

    #[test]
    fn test_splices_in_source_order_and_prepends_preamble() {
        let out = run(
            "import { css, keyframes } from \"styled-static\";\nconst a = css`color: red;`;\nconst spin = keyframes`to { rotate: 1turn; }`;\nexport { a, spin };\n",
        );
        let expected = format!(
            "import {};\nimport {};\nimport {{ css, keyframes }} from \"styled-static\";\nconst a = \"ss-a-App\";\nconst spin = \"ss-spin-App\";\nexport {{ a, spin }};\n",
            SafeLiteral::string(&virtual_id("src/App.tsx", 0)),
            SafeLiteral::string(&virtual_id("src/App.tsx", 1)),
        );
        assert_eq!(out.code, expected);
        assert_eq!(out.css_modules.len(), 2);
    }

    #[test]
    fn test_preamble_goes_after_directives() {
        let out = run("\"use client\";\nimport { css } from \"styled-static\";\nconst a = css`color: red;`;\n");
        assert!(out.code.starts_with("\"use client\";\nimport \"virtual:styled-static/"));
    }

    #[test]
    fn test_preamble_goes_after_hashbang() {
        let out = run("#!/usr/bin/env node\nimport { css } from \"styled-static\";\nconst a = css`color: red;`;\n");
        assert!(out.code.starts_with("#!/usr/bin/env node\nimport \"virtual:styled-static/"));

        let out = run("#!/usr/bin/env node\n\"use strict\";\nimport { css } from \"styled-static\";\nconst a = css`color: red;`;\n");
        assert!(out.code.starts_with("#!/usr/bin/env node\n\"use strict\";\nimport \"virtual:styled-static/"));
    }

    #[test]
    fn test_source_map_points_back_to_original_lines() {
        let out = run("import { styled } from \"styled-static\";\n\nconst Box = styled.div`display: flex;`;\n");
        let generated_line = out
            .code
            .lines()
            .position(|l| l.starts_with("const Box"))
            .unwrap() as u32;
        let token = out
            .map
            .lookup_token(generated_line, 12)
            .expect("replacement is mapped");
        assert_eq!(token.get_src_line(), 2);
        assert_eq!(token.get_src_col(), 12);

        let json = out.map_json().unwrap();
        assert!(json.contains("\"version\":3"));
        assert!(out
            .inline_map_comment()
            .unwrap()
            .starts_with("//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));
    }
}
