//! The build-session object a host bundler drives through its hooks.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::parse::strip_query;
use crate::registry::{canonical_id, is_virtual_id, CssRegistry};
use crate::safe::SafeLiteral;
use crate::transform::{transform_file, TransformOutcome, TransformOutput};

/// Residual static imports of virtual CSS modules in bundled chunk code.
static VIRTUAL_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*["'](?:\\0|\x00)?virtual:styled-static/[^"'\n]*["'];?[ \t]*\r?\n?"#)
        .expect("virtual import pattern")
});

const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// One output chunk as reported by the host at bundle finalization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputChunk {
    pub file_name: String,
    /// Source files and virtual modules the chunk was built from, in order.
    pub module_ids: Vec<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedAsset {
    pub file_name: String,
    pub source: String,
}

/// One build session: configuration plus the CSS modules produced so far.
#[derive(Debug, Clone)]
pub struct StyledStatic {
    config: Config,
    registry: Arc<CssRegistry>,
}

impl StyledStatic {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "styled-static session: {:?} mode, prefix `{}`",
            config.mode,
            config.class_prefix
        );
        Ok(Self {
            config,
            registry: Arc::new(CssRegistry::new()),
        })
    }

    /// Build a session from the host's JSON plugin options.
    pub fn from_json(options: &str) -> Result<Self> {
        Self::new(Config::from_json(options)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CssRegistry> {
        &self.registry
    }

    fn handles(id: &str) -> bool {
        if is_virtual_id(id) || id.contains("/node_modules/") {
            return false;
        }
        strip_query(id)
            .rsplit_once('.')
            .is_some_and(|(_, ext)| SCRIPT_EXTENSIONS.contains(&ext))
    }

    /// Transform hook. `Ok(None)` tells the host to keep the file as is.
    pub fn transform(&self, source: &str, id: &str) -> Result<Option<TransformOutput>> {
        Ok(self.transform_outcome(source, id)?.into_output())
    }

    pub fn transform_outcome(&self, source: &str, id: &str) -> Result<TransformOutcome> {
        if !Self::handles(id) {
            return Ok(TransformOutcome::NotApplicable);
        }
        transform_file(source, id, &self.config, &self.registry)
    }

    /// Claim virtual CSS ids, returning their canonical form.
    pub fn resolve_id(&self, id: &str) -> Option<String> {
        canonical_id(id)
    }

    /// Contents of a virtual module, or `None` for ids owned by someone else.
    pub fn load(&self, id: &str) -> Option<String> {
        if !is_virtual_id(id) {
            return None;
        }
        let entry = self.registry.entry(id);
        if entry.is_none() {
            // Imports can outlive their entries between an invalidation and
            // the importer's retransform.
            log::debug!("{}: no css registered", id.trim_start_matches('\0'));
        }
        let (css, content_hash) = entry
            .map(|e| (e.css, e.content_hash))
            .unwrap_or_default();
        if self.config.mode.is_production() {
            return Some(if self.config.extract_css { String::new() } else { css });
        }
        Some(style_injector(id.trim_start_matches('\0'), &css, &content_hash))
    }

    /// Drop the CSS modules of a changed file; the returned canonical ids are
    /// the virtual modules the host should invalidate.
    pub fn on_source_changed(&self, path: &str) -> Vec<String> {
        self.registry.invalidate(path)
    }

    /// Emit one stylesheet per chunk that owns CSS and point the chunk at it
    /// with a single relative import, replacing any virtual imports left in
    /// its code.
    pub fn finalize_bundle(&self, chunks: &mut [OutputChunk]) -> Vec<EmittedAsset> {
        let mut assets = Vec::new();
        for chunk in chunks.iter_mut() {
            let css = self.registry.aggregate_by_output_chunk(&chunk.module_ids);
            if css.is_empty() {
                chunk.code = VIRTUAL_IMPORT.replace_all(&chunk.code, "").into_owned();
                continue;
            }
            let file_name = css_asset_name(&chunk.file_name);
            let import = format!(
                "import {};\n",
                SafeLiteral::string(&format!("./{}", base_name(&file_name)))
            );
            chunk.code = rewrite_virtual_imports(&chunk.code, &import);
            log::debug!("{}: emitting {file_name}", chunk.file_name);
            assets.push(EmittedAsset {
                file_name,
                source: css,
            });
        }
        assets
    }

    /// End of the build session.
    pub fn teardown(&self) {
        log::debug!("styled-static session ends with {} css modules", self.registry.len());
        self.registry.clear();
    }
}

/// The first virtual import becomes `import`; later ones are dropped. Code
/// without any gets `import` prepended.
fn rewrite_virtual_imports(code: &str, import: &str) -> String {
    let mut first = true;
    let rewritten = VIRTUAL_IMPORT.replace_all(code, |_: &regex::Captures<'_>| {
        if std::mem::take(&mut first) {
            import.to_string()
        } else {
            String::new()
        }
    });
    if first {
        format!("{import}{code}")
    } else {
        rewritten.into_owned()
    }
}

/// `assets/index-a1b2.js` -> `assets/index-a1b2.css`
fn css_asset_name(chunk_file: &str) -> String {
    let (dir, file) = match chunk_file.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, chunk_file),
    };
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    match dir {
        Some(dir) => format!("{dir}/{stem}.css"),
        None => format!("{stem}.css"),
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Development module for one virtual id: owns a `<style data-ss-id>` element
/// and re-applies itself on hot update.
fn style_injector(id: &str, css: &str, content_hash: &str) -> String {
    let id = SafeLiteral::string(id);
    let css = SafeLiteral::string(css);
    let content_hash = SafeLiteral::string(content_hash);
    format!(
        r#"const id = {id};
const css = {css};
const hash = {content_hash};
if (typeof document !== "undefined") {{
  let el = Array.from(document.querySelectorAll("style[data-ss-id]")).find((s) => s.getAttribute("data-ss-id") === id);
  if (!el) {{
    el = document.createElement("style");
    el.setAttribute("data-ss-id", id);
    document.head.appendChild(el);
  }}
  if (el.getAttribute("data-ss-hash") !== hash) {{
    el.setAttribute("data-ss-hash", hash);
    el.textContent = css;
  }}
}}
if (import.meta.hot) {{
  import.meta.hot.accept();
  import.meta.hot.prune(() => {{
    for (const s of document.querySelectorAll("style[data-ss-id]")) {{
      if (s.getAttribute("data-ss-id") === id) s.remove();
    }}
  }});
}}
export default css;
"#
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::registry::virtual_id;

    const SOURCE: &str = "import { css } from \"styled-static\";\nexport const a = css`color: red;`;\n";

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_session_is_shareable() {
        assert_send_sync::<StyledStatic>();
    }

    #[test]
    fn test_invalid_options_fail_construction() {
        assert!(StyledStatic::from_json(r#"{ "classPrefix": "1x" }"#).is_err());
        assert!(StyledStatic::from_json(r#"{ "unknown": true }"#).is_err());
        assert!(StyledStatic::from_json("").is_ok());
    }

    #[test]
    fn test_only_script_files_are_transformed() {
        let session = StyledStatic::new(Config::default()).unwrap();
        assert!(session.transform(SOURCE, "src/a.css").unwrap().is_none());
        assert!(session.transform(SOURCE, "/app/node_modules/x/a.js").unwrap().is_none());
        assert!(session.transform(SOURCE, "src/a.ts?v=1").unwrap().is_some());
    }

    #[test]
    fn test_resolve_and_load_in_development() {
        let session = StyledStatic::new(Config::default()).unwrap();
        session.transform(SOURCE, "src/a.ts").unwrap();
        let import = virtual_id("src/a.ts", 0);
        let canonical = session.resolve_id(&import).unwrap();
        assert_eq!(canonical, format!("\0{import}"));
        assert_eq!(session.resolve_id("./a.css"), None);

        let module = session.load(&canonical).unwrap();
        assert!(module.contains(r#"const css = ".ss-a-a { color: red; }";"#));
        assert!(module.contains("data-ss-id"));
        let hash = session.registry().entry(&canonical).unwrap().content_hash;
        assert!(module.contains(&format!("const hash = \"{hash}\";")));
        assert!(module.contains("import.meta.hot"));
        assert_eq!(session.load("src/a.ts"), None);
    }

    #[test]
    fn test_load_in_production() {
        let session = StyledStatic::new(Config::production()).unwrap();
        session.transform(SOURCE, "src/a.ts").unwrap();
        let css = session.load(&virtual_id("src/a.ts", 0)).unwrap();
        assert!(css.starts_with(".ss-") && css.ends_with(" { color: red; }"));

        let extracting = StyledStatic::from_json(r#"{ "mode": "production", "extractCss": true }"#).unwrap();
        extracting.transform(SOURCE, "src/a.ts").unwrap();
        assert_eq!(extracting.load(&virtual_id("src/a.ts", 0)).as_deref(), Some(""));
    }

    #[test]
    fn test_source_change_invalidates() {
        let session = StyledStatic::new(Config::default()).unwrap();
        session.transform(SOURCE, "src/a.ts").unwrap();
        let ids = session.on_source_changed("src/a.ts");
        assert_eq!(ids, vec![format!("\0{}", virtual_id("src/a.ts", 0))]);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_finalize_bundle_collapses_virtual_imports() {
        let session = StyledStatic::new(Config::production()).unwrap();
        session.transform(SOURCE, "src/a.ts").unwrap();
        session
            .transform(
                "import { css } from \"styled-static\";\nexport const b = css`color: blue;`;\n",
                "src/b.ts",
            )
            .unwrap();

        let mut chunks = vec![
            OutputChunk {
                file_name: "assets/index.js".to_string(),
                module_ids: vec!["src/a.ts".to_string(), "src/b.ts".to_string()],
                code: format!(
                    "import \"{}\";\nimport \"{}\";\nconsole.log(1);\n",
                    virtual_id("src/a.ts", 0),
                    virtual_id("src/b.ts", 0)
                ),
            },
            OutputChunk {
                file_name: "vendor.js".to_string(),
                module_ids: vec!["node_modules/react/index.js".to_string()],
                code: "export {};\n".to_string(),
            },
        ];
        let assets = session.finalize_bundle(&mut chunks);
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].file_name, "assets/index.css");
        assert!(assets[0].source.contains("color: red;"));
        assert!(assets[0].source.contains("color: blue;"));
        assert_eq!(chunks[0].code, "import \"./index.css\";\nconsole.log(1);\n");
        assert_eq!(chunks[1].code, "export {};\n");
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(css_asset_name("assets/index-a1b2.js"), "assets/index-a1b2.css");
        assert_eq!(css_asset_name("lib.mjs"), "lib.css");
        assert_eq!(css_asset_name("assets/a.client.js"), "assets/a.client.css");
        assert_eq!(css_asset_name("assets/a.server.js"), "assets/a.server.css");
    }

    #[test]
    fn test_teardown_clears_registry() {
        let session = StyledStatic::new(Config::default()).unwrap();
        session.transform(SOURCE, "src/a.ts").unwrap();
        assert!(!session.registry().is_empty());
        session.teardown();
        assert!(session.registry().is_empty());
    }
}
