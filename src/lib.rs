//! Compile-time extraction of styled templates.
//!
//! Source files that import the `styled-static` authoring API are rewritten so
//! that every `styled.tag`, `css`, `createGlobalStyle`, `keyframes`,
//! `styledVariants`, `cssVariants` and `withComponent` construct becomes a
//! small runtime call, while its literal CSS is moved into a virtual CSS
//! module. A [`StyledStatic`] session is what a host bundler drives:
//!
//! ```no_run
//! use static_styles_swc::StyledStatic;
//!
//! let session = StyledStatic::from_json(r#"{ "mode": "production" }"#)?;
//! let source = "import { styled } from \"styled-static\";\nexport const Button = styled.button`padding: 1rem;`;\n";
//! if let Some(output) = session.transform(source, "src/Button.tsx")? {
//!     println!("{}\n{}", output.code, output.inline_map_comment()?);
//! }
//! # Ok::<(), static_styles_swc::Error>(())
//! ```

// -----------------------------------------------------------------------------
// Front end: parsing, bindings, classification
// -----------------------------------------------------------------------------

pub mod classify;
pub mod extract;
pub mod imports;
pub mod parse;

// -----------------------------------------------------------------------------
// Naming, CSS and generated code
// -----------------------------------------------------------------------------

pub mod codegen;
pub mod css;
pub mod hash;
pub mod naming;
pub mod safe;

// -----------------------------------------------------------------------------
// Session, registry and orchestration
// -----------------------------------------------------------------------------

pub mod config;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod transform;

pub use config::{Config, Mode};
pub use error::{Error, IdentifierKind, Result};
pub use plugin::{EmittedAsset, OutputChunk, StyledStatic};
pub use registry::{CssModuleEntry, CssRegistry};
pub use transform::{transform_file, TransformOutcome, TransformOutput};
