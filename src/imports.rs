//! Resolves which local names are bound to the authoring API in a file.

use swc_core::ecma::{
    ast::*,
    visit::{Visit, VisitWith},
};

use crate::config::Config;

/// Exports of the authoring API the transform knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiSymbol {
    Styled,
    Css,
    CreateGlobalStyle,
    Keyframes,
    StyledVariants,
    CssVariants,
    WithComponent,
    Cx,
}

impl ApiSymbol {
    pub const ALL: [ApiSymbol; 8] = [
        ApiSymbol::Styled,
        ApiSymbol::Css,
        ApiSymbol::CreateGlobalStyle,
        ApiSymbol::Keyframes,
        ApiSymbol::StyledVariants,
        ApiSymbol::CssVariants,
        ApiSymbol::WithComponent,
        ApiSymbol::Cx,
    ];

    pub fn export_name(self) -> &'static str {
        match self {
            ApiSymbol::Styled => "styled",
            ApiSymbol::Css => "css",
            ApiSymbol::CreateGlobalStyle => "createGlobalStyle",
            ApiSymbol::Keyframes => "keyframes",
            ApiSymbol::StyledVariants => "styledVariants",
            ApiSymbol::CssVariants => "cssVariants",
            ApiSymbol::WithComponent => "withComponent",
            ApiSymbol::Cx => "cx",
        }
    }

    pub fn from_export_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.export_name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Local names bound to each API export in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBindings {
    locals: [Option<String>; 8],
    /// Runtime module path implied by the first recognized import source.
    runtime_source: Option<String>,
}

impl ImportBindings {
    /// Scan the top-level import declarations of `module`.
    pub fn collect(module: &Module, config: &Config) -> Self {
        let mut binder = ImportBinder {
            config,
            out: ImportBindings::default(),
        };
        module.visit_with(&mut binder);
        binder.out
    }

    pub fn local(&self, symbol: ApiSymbol) -> Option<&str> {
        self.locals[symbol.index()].as_deref()
    }

    /// True when `name` is the local binding of `symbol`.
    pub fn is(&self, symbol: ApiSymbol, name: &str) -> bool {
        self.local(symbol) == Some(name)
    }

    pub fn symbol_for_local(&self, name: &str) -> Option<ApiSymbol> {
        ApiSymbol::ALL.into_iter().find(|s| self.is(*s, name))
    }

    /// No recognized import at all: the file is not ours to transform.
    pub fn is_empty(&self) -> bool {
        self.runtime_source.is_none()
    }

    pub fn runtime_source(&self) -> Option<&str> {
        self.runtime_source.as_deref()
    }
}

struct ImportBinder<'a> {
    config: &'a Config,
    out: ImportBindings,
}

impl ImportBinder<'_> {
    fn record(&mut self, decl: &ImportDecl) {
        if decl.type_only {
            return;
        }
        let Some(runtime) = self.config.runtime_source_for(decl.src.value.as_ref()) else {
            return;
        };
        self.out.runtime_source.get_or_insert(runtime);

        for s in &decl.specifiers {
            let ImportSpecifier::Named(named) = s else {
                continue;
            };
            if named.is_type_only {
                continue;
            }
            let imported = named
                .imported
                .as_ref()
                .map(|i| match i {
                    ModuleExportName::Ident(i) => i.sym.to_string(),
                    ModuleExportName::Str(s) => s.value.to_string(),
                })
                .unwrap_or_else(|| named.local.sym.to_string());
            if let Some(symbol) = ApiSymbol::from_export_name(&imported) {
                self.out.locals[symbol.index()] = Some(named.local.sym.to_string());
            }
        }
    }
}

impl Visit for ImportBinder<'_> {
    // Imports only live at module level; statements are never entered.
    fn visit_module_item(&mut self, n: &ModuleItem) {
        if let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = n {
            self.record(decl);
        }
    }
}
