//! Manifest backend: validates generated page classes and produces
//! activatable types describing them.

use std::sync::LazyLock;

use regex::Regex;

use crate::compilation::document::GeneratedDocument;
use crate::compilation::engine::{BackendDiagnostic, CompilerBackend};
use crate::compilation::result::CompiledType;
use crate::page::{PageActivator, RazorPage};

static RE_LINE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^#line \((\d+),(\d+)\)-\((\d+),(\d+)\) "(.*)"$"#).unwrap()
});

static RE_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[(RazorPage|AddTagHelper)\("(.*)"\)\]$"#).unwrap());

/// Property injected into a page instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedProperty {
    pub type_name: String,
    pub name: String,
}

/// Compiled description of a page class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestType {
    pub namespace: String,
    pub type_name: String,
    pub base_type: String,
    /// Route of an `@page`, `None` for views.
    pub route: Option<String>,
    pub injects: Vec<InjectedProperty>,
    pub tag_helpers: Vec<String>,
}

impl PageActivator for ManifestType {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn activate(&self) -> Box<dyn RazorPage> {
        Box::new(ManifestPage {
            type_name: self.type_name.clone(),
            path: String::new(),
        })
    }
}

/// Page instance produced by a [`ManifestType`].
#[derive(Debug, Clone)]
pub struct ManifestPage {
    type_name: String,
    path: String,
}

impl RazorPage for ManifestPage {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
    }
}

/// Source span from the most recent `#line` pragma.
#[derive(Debug, Clone)]
struct Mapping {
    file: String,
    line: usize,
    column: usize,
    end_line: usize,
    end_column: usize,
}

/// Backend that checks the generated class skeleton.
///
/// - `using` namespaces must be covered by a reference (when any are configured)
/// - injected property names must be identifiers
/// - base and injected types must be well-formed type names
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestBackend;

impl ManifestBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerBackend for ManifestBackend {
    fn compile(
        &self,
        generated: &GeneratedDocument,
        references: &[String],
    ) -> Result<CompiledType, Vec<BackendDiagnostic>> {
        let mut checker = Checker::default();
        let mut namespace = None;
        let mut class = None;
        let mut route = None;
        let mut tag_helpers = Vec::new();
        let mut injects = Vec::new();

        for (index, raw) in generated.generated_code.lines().enumerate() {
            checker.generated_line = index + 1;
            let line = raw.trim();

            if let Some(pragma) = line.strip_prefix("#line ") {
                checker.mapping = parse_mapping(line, pragma);
                continue;
            }
            if line.starts_with("#pragma") {
                continue;
            }

            if let Some(ns) = line.strip_prefix("namespace ") {
                namespace = Some(ns.trim().to_string());
            } else if let Some(using) = line.strip_prefix("using ").and_then(|u| u.strip_suffix(';')) {
                if !is_referenced(using, references) {
                    checker.error(
                        "RV0246",
                        format!("The type or namespace name '{using}' could not be found (are you missing a reference?)"),
                    );
                }
            } else if let Some(caps) = RE_ATTRIBUTE.captures(line) {
                match &caps[1] {
                    "RazorPage" => route = Some(caps[2].to_string()),
                    _ => tag_helpers.push(caps[2].to_string()),
                }
            } else if let Some(decl) = line.strip_prefix("public class ") {
                let (name, base) = decl.split_once(" : ").unwrap_or((decl, ""));
                checker.check_type(base.trim());
                class = Some((name.trim().to_string(), base.trim().to_string()));
            } else if let Some(property) = line
                .strip_prefix("[RazorInject] public ")
                .and_then(|p| p.strip_suffix(" { get; private set; }"))
            {
                let (type_name, name) = property.rsplit_once(' ').unwrap_or(("", property));
                checker.check_type(type_name);
                checker.check_identifier(name);
                injects.push(InjectedProperty {
                    type_name: type_name.to_string(),
                    name: name.to_string(),
                });
            }
        }

        let Some((type_name, base_type)) = class else {
            checker.mapping = None;
            checker.error("RV0101", "Generated code does not declare a page class.".to_string());
            return Err(checker.diagnostics);
        };

        if !checker.diagnostics.is_empty() {
            return Err(checker.diagnostics);
        }

        Ok(CompiledType::new(ManifestType {
            namespace: namespace.unwrap_or_default(),
            type_name,
            base_type,
            route,
            injects,
            tag_helpers,
        }))
    }
}

#[derive(Default)]
struct Checker {
    mapping: Option<Mapping>,
    generated_line: usize,
    diagnostics: Vec<BackendDiagnostic>,
}

impl Checker {
    fn error(&mut self, id: &str, message: String) {
        let diagnostic = match &self.mapping {
            Some(m) => BackendDiagnostic::at(message, Some(m.file.clone()), m.line, m.column)
                .with_end(m.end_line, m.end_column),
            None => BackendDiagnostic::at(message, None, self.generated_line, 1),
        };
        self.diagnostics.push(diagnostic.with_id(id));
    }

    fn check_identifier(&mut self, name: &str) {
        if !is_identifier(name) {
            self.error(
                "RV1001",
                format!("Identifier expected; '{name}' is not a valid identifier."),
            );
        }
    }

    fn check_type(&mut self, type_name: &str) {
        if !is_type_name(type_name) {
            self.error("RV1002", format!("'{type_name}' is not a valid type name."));
        }
    }
}

/// `None` for `#line default` / `#line hidden`.
fn parse_mapping(line: &str, pragma: &str) -> Option<Mapping> {
    if matches!(pragma.trim(), "default" | "hidden") {
        return None;
    }
    let caps = RE_LINE_SPAN.captures(line)?;
    let number = |i: usize| caps[i].parse().unwrap_or(0);
    Some(Mapping {
        line: number(1),
        column: number(2),
        end_line: number(3),
        end_column: number(4),
        file: caps[5].to_string(),
    })
}

fn is_referenced(namespace: &str, references: &[String]) -> bool {
    references.is_empty()
        || references.iter().any(|r| {
            namespace == r
                || namespace
                    .strip_prefix(r.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Dotted identifiers with balanced generic arguments, optional `[]`/`?`.
fn is_type_name(type_name: &str) -> bool {
    let mut depth = 0usize;
    // At the start of an identifier segment
    let mut expect_ident = true;

    for c in type_name.chars() {
        match c {
            c if c.is_alphabetic() || c == '_' => expect_ident = false,
            c if c.is_ascii_digit() => {
                if expect_ident {
                    return false;
                }
            }
            '.' | ',' | '<' => {
                if expect_ident || (c == ',' && depth == 0) {
                    return false;
                }
                if c == '<' {
                    depth += 1;
                }
                expect_ident = true;
            }
            '>' => {
                if expect_ident || depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            ' ' if depth > 0 => {}
            '[' | ']' | '?' if !expect_ident => {}
            _ => return false,
        }
    }
    depth == 0 && !expect_ident
}
