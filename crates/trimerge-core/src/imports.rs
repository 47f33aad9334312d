//! ES module import declarations, parsed with tree-sitter.
//!
//! [`ImportMap`] is an ordered multimap from module specifier to the
//! bindings imported from it. Both the module order and the binding order
//! follow first appearance, so combining and re-rendering two import blocks
//! is deterministic and stable against the input.

use std::collections::BTreeSet;
use std::fmt;

use tree_sitter::{Node, Parser, Tree};

use crate::error::MergeError;

// ---------------------------------------------------------------------------
// ImportSpecifier
// ---------------------------------------------------------------------------

/// One binding introduced by an import declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportSpecifier {
    /// `import name from "m"`
    Default(String),
    /// `import * as name from "m"`
    Namespace(String),
    /// `import { name } from "m"` or `import { name as alias } from "m"`
    Named {
        name: String,
        alias: Option<String>,
    },
}

impl ImportSpecifier {
    /// The identifier this specifier binds in the importing module.
    #[must_use]
    pub fn local_name(&self) -> &str {
        match self {
            Self::Default(name) | Self::Namespace(name) => name,
            Self::Named { name, alias } => alias.as_deref().unwrap_or(name),
        }
    }
}

impl fmt::Display for ImportSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(name) => write!(f, "{name}"),
            Self::Namespace(name) => write!(f, "* as {name}"),
            Self::Named { name, alias: None } => write!(f, "{name}"),
            Self::Named {
                name,
                alias: Some(alias),
            } => write!(f, "{name} as {alias}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ImportMap
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
struct ModuleImports {
    source: String,
    quote: char,
    specifiers: Vec<ImportSpecifier>,
}

/// Ordered multimap of module specifier to imported bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportMap {
    modules: Vec<ModuleImports>,
}

impl ImportMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every top-level import declaration in `text`.
    ///
    /// Statements that are not imports are ignored; see [`is_import_block`]
    /// to check that a text consists of imports only.
    ///
    /// # Errors
    /// Returns [`MergeError`] if the JavaScript grammar cannot be loaded or
    /// the parser gives up on the input.
    pub fn parse(text: &str) -> Result<Self, MergeError> {
        let tree = parse_js(text)?;
        let source = text.as_bytes();
        let mut map = Self::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() == "import_statement" {
                map.insert_statement(statement, source);
            }
        }
        Ok(map)
    }

    fn insert_statement(&mut self, statement: Node<'_>, source: &[u8]) {
        let Some(source_node) = statement.child_by_field_name("source") else {
            return;
        };
        let raw = node_text(source_node, source);
        let quote = if raw.starts_with('\'') { '\'' } else { '"' };
        let module = raw.trim_matches(|c| c == '"' || c == '\'');
        self.touch_module(module, quote);

        let mut cursor = statement.walk();
        for child in statement.named_children(&mut cursor) {
            if child.kind() == "import_clause" {
                for specifier in clause_specifiers(child, source) {
                    self.insert(module, specifier);
                }
            }
        }
    }

    fn touch_module(&mut self, source: &str, quote: char) -> &mut ModuleImports {
        let index = match self.modules.iter().position(|m| m.source == source) {
            Some(index) => index,
            None => {
                self.modules.push(ModuleImports {
                    source: source.to_owned(),
                    quote,
                    specifiers: Vec::new(),
                });
                self.modules.len() - 1
            }
        };
        &mut self.modules[index]
    }

    /// Add `specifier` to `module` unless it is already imported from there.
    ///
    /// Returns `true` if the specifier was new.
    pub fn insert(&mut self, module: &str, specifier: ImportSpecifier) -> bool {
        let entry = self.touch_module(module, '"');
        if entry.specifiers.contains(&specifier) {
            false
        } else {
            entry.specifiers.push(specifier);
            true
        }
    }

    /// Whether `module` is imported at all (even without bindings).
    #[must_use]
    pub fn contains_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m.source == module)
    }

    /// Bindings imported from `module`, in order.
    #[must_use]
    pub fn specifiers(&self, module: &str) -> &[ImportSpecifier] {
        self.modules
            .iter()
            .find(|m| m.source == module)
            .map_or(&[], |m| m.specifiers.as_slice())
    }

    /// Module specifiers in first-seen order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.source.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Merge `other` into `self`, skipping entries `self` already has.
    ///
    /// Modules new to `self` are appended after the existing ones and keep
    /// their quote style from `other`.
    pub fn combine_non_duplicates(&mut self, other: &Self) {
        for module in &other.modules {
            let entry = self.touch_module(&module.source, module.quote);
            for specifier in &module.specifiers {
                if !entry.specifiers.contains(specifier) {
                    entry.specifiers.push(specifier.clone());
                }
            }
        }
    }

    /// Every local identifier bound by the imports.
    #[must_use]
    pub fn identifiers(&self) -> BTreeSet<String> {
        self.modules
            .iter()
            .flat_map(|m| m.specifiers.iter())
            .map(|s| s.local_name().to_owned())
            .collect()
    }

    /// Render one declaration per module, each terminated by `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for module in &self.modules {
            render_module(module, &mut out);
        }
        out
    }
}

fn render_module(module: &ModuleImports, out: &mut String) {
    let from = format!("{q}{}{q}", module.source, q = module.quote);
    let mut default = None;
    let mut namespaces = Vec::new();
    let mut named = Vec::new();
    for specifier in &module.specifiers {
        match specifier {
            ImportSpecifier::Default(_) if default.is_none() => default = Some(specifier),
            ImportSpecifier::Default(_) | ImportSpecifier::Named { .. } => {
                named.push(specifier_as_named(specifier));
            }
            ImportSpecifier::Namespace(_) => namespaces.push(specifier),
        }
    }

    if default.is_none() && named.is_empty() && namespaces.is_empty() {
        out.push_str(&format!("import {from};\n"));
        return;
    }
    if default.is_some() || !named.is_empty() {
        let mut clause = Vec::new();
        if let Some(default) = default {
            clause.push(default.to_string());
        }
        if !named.is_empty() {
            clause.push(format!("{{ {} }}", named.join(", ")));
        }
        out.push_str(&format!("import {} from {from};\n", clause.join(", ")));
    }
    for namespace in namespaces {
        out.push_str(&format!("import {namespace} from {from};\n"));
    }
}

/// A second default import from the same module can only be expressed as a
/// named `default` binding.
fn specifier_as_named(specifier: &ImportSpecifier) -> String {
    match specifier {
        ImportSpecifier::Default(local) => format!("default as {local}"),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Whether `text` consists of import declarations only.
///
/// Whitespace-only text qualifies. Comments, other statements and syntax
/// errors disqualify.
///
/// # Errors
/// Returns [`MergeError`] if the parser cannot be set up.
pub fn is_import_block(text: &str) -> Result<bool, MergeError> {
    if text.trim().is_empty() {
        return Ok(true);
    }
    let tree = parse_js(text)?;
    let root = tree.root_node();
    if root.has_error() {
        return Ok(false);
    }
    let mut cursor = root.walk();
    let all_imports = root
        .named_children(&mut cursor)
        .all(|statement| statement.kind() == "import_statement");
    Ok(all_imports)
}

/// Split `text` into its leading import declarations and the remaining body.
///
/// The body starts at the first non-whitespace byte after the last leading
/// import. Text without leading imports is returned entirely as body.
///
/// # Errors
/// Returns [`MergeError`] if the parser cannot be set up.
pub fn split_import_block(text: &str) -> Result<(&str, &str), MergeError> {
    let tree = parse_js(text)?;
    let root = tree.root_node();
    let mut cursor = root.walk();
    let mut end = 0;
    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "import_statement" {
            break;
        }
        end = statement.end_byte();
    }
    let (imports, body) = text.split_at(end);
    Ok((imports, body.trim_start()))
}

fn parse_js(text: &str) -> Result<Tree, MergeError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| MergeError::ParserSetup(e.to_string()))?;
    parser.parse(text, None).ok_or(MergeError::ParseFailed)
}

fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

fn clause_specifiers(clause: Node<'_>, source: &[u8]) -> Vec<ImportSpecifier> {
    let mut specifiers = Vec::new();
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                specifiers.push(ImportSpecifier::Default(node_text(child, source).to_owned()));
            }
            "namespace_import" => {
                let mut inner = child.walk();
                if let Some(name) = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "identifier")
                {
                    specifiers.push(ImportSpecifier::Namespace(
                        node_text(name, source).to_owned(),
                    ));
                }
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child
                    .named_children(&mut inner)
                    .filter(|n| n.kind() == "import_specifier")
                {
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    specifiers.push(ImportSpecifier::Named {
                        name: node_text(name, source).to_owned(),
                        alias: spec
                            .child_by_field_name("alias")
                            .map(|alias| node_text(alias, source).to_owned()),
                    });
                }
            }
            _ => {}
        }
    }
    specifiers
}
