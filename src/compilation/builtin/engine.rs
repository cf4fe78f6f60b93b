//! Directive-level template engine.
//!
//! Merges the directives of the import chain and the template into a
//! page class skeleton. Every directive-derived line is preceded by a
//! `#line` span pragma pointing back at its source so backend errors can
//! be mapped to the template or import file that caused them.

use std::fmt::Write;

use super::directives::{Directive, DirectiveKind, ScannedDocument, scan};
use crate::compilation::document::{CodeDocument, GeneratedDocument, SourceDocument};
use crate::compilation::engine::TemplateEngine;
use crate::freshness::hash_bytes;

const DEFAULT_NAMESPACE: &str = "AspNetCore";
const VIEW_BASE_TYPE: &str = "Microsoft.AspNetCore.Mvc.Razor.RazorPage<TModel>";
const PAGE_BASE_TYPE: &str = "Microsoft.AspNetCore.Mvc.RazorPages.Page";
const DYNAMIC_MODEL: &str = "dynamic";

/// 1-based source span of a directive, `None` for synthesized sources.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    file: String,
    line: usize,
    column: usize,
    end_column: usize,
}

type Mapped = (String, Option<Span>);

/// Merged directives. Later documents override earlier ones.
#[derive(Debug, Default)]
struct PageModel {
    namespace: Option<Mapped>,
    usings: Vec<Mapped>,
    injects: Vec<(String, String, Option<Span>)>,
    model: Option<Mapped>,
    inherits: Option<Mapped>,
    route: Option<String>,
    tag_helpers: Vec<String>,
    tag_helper_prefix: Option<String>,
}

impl PageModel {
    fn apply(&mut self, directive: &Directive, file: Option<&str>) {
        let span = file.map(|file| Span {
            file: file.to_string(),
            line: directive.line + 1,
            column: directive.column + 1,
            end_column: directive.end_column + 1,
        });
        let value = directive.value.clone();

        match directive.kind {
            DirectiveKind::Using => {
                if !self.usings.iter().any(|(ns, _)| *ns == value) {
                    self.usings.push((value, span));
                }
            }
            DirectiveKind::Inject => {
                let Some((type_name, name)) = value.rsplit_once(char::is_whitespace) else {
                    return;
                };
                let (type_name, name) = (type_name.trim().to_string(), name.to_string());
                match self.injects.iter_mut().find(|(_, n, _)| *n == name) {
                    Some(existing) => *existing = (type_name, name, span),
                    None => self.injects.push((type_name, name, span)),
                }
            }
            DirectiveKind::Model => self.model = Some((value, span)),
            DirectiveKind::Inherits => self.inherits = Some((value, span)),
            DirectiveKind::Namespace => self.namespace = Some((value, span)),
            DirectiveKind::Page => self.route = Some(value),
            DirectiveKind::AddTagHelper => self.tag_helpers.push(value),
            DirectiveKind::RemoveTagHelper => self.tag_helpers.retain(|t| *t != value),
            DirectiveKind::TagHelperPrefix => self.tag_helper_prefix = Some(value),
        }
    }

    fn model_type(&self) -> &str {
        self.model.as_ref().map_or(DYNAMIC_MODEL, |(model, _)| model.as_str())
    }

    /// Base type with `TModel` substituted, and the directive it came from.
    fn base_type(&self) -> (String, Option<&Span>) {
        if let Some((inherits, span)) = &self.inherits {
            return (substitute_model(inherits, self.model_type()), span.as_ref());
        }
        if self.route.is_some() {
            return (PAGE_BASE_TYPE.to_string(), None);
        }
        let span = self.model.as_ref().and_then(|(_, span)| span.as_ref());
        (substitute_model(VIEW_BASE_TYPE, self.model_type()), span)
    }
}

/// Replace the `TModel` placeholder in a type name.
fn substitute_model(type_name: &str, model: &str) -> String {
    type_name.replace("<TModel>", &format!("<{model}>"))
}

/// Class name for a template path: `/Views/Home/Index.cshtml` → `Views_Home_Index`.
pub fn class_name(relative_path: &str) -> String {
    let trimmed = relative_path.trim_start_matches('/');
    let stem = trimmed.rsplit_once('.').map_or(trimmed, |(stem, _)| stem);
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Template engine handling directives and code-block structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveEngine;

impl DirectiveEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for DirectiveEngine {
    fn generate(&self, document: &CodeDocument) -> GeneratedDocument {
        let mut model = PageModel::default();
        let mut diagnostics = Vec::new();

        for import in &document.imports {
            let scanned = scan(import, import.file_path(), true);
            merge(&mut model, &scanned, import.file_path());
            diagnostics.extend(scanned.errors);
        }

        let mut template = scan(&document.source, None, false);
        merge(&mut model, &template, Some(&document.relative_path));
        diagnostics.append(&mut template.errors);

        if !diagnostics.is_empty() {
            return GeneratedDocument {
                generated_code: String::new(),
                diagnostics,
            };
        }

        GeneratedDocument {
            generated_code: render(&model, &template, &document.source, &document.relative_path),
            diagnostics,
        }
    }
}

fn merge(model: &mut PageModel, scanned: &ScannedDocument, file: Option<&str>) {
    for directive in &scanned.directives {
        model.apply(directive, file);
    }
}

// =============================================================================
// Code generation
// =============================================================================

struct Writer {
    out: String,
}

impl Writer {
    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Emit `text` wrapped in a `#line` span when it maps to a source.
    fn mapped(&mut self, indent: usize, span: Option<&Span>, text: &str) {
        match span {
            Some(span) => {
                writeln!(
                    self.out,
                    "#line ({line},{column})-({line},{end}) \"{file}\"",
                    line = span.line,
                    column = span.column,
                    end = span.end_column,
                    file = span.file,
                )
                .ok();
                self.line(indent, text);
                self.out.push_str("#line default\n");
            }
            None => self.line(indent, text),
        }
    }
}

fn render(model: &PageModel, template: &ScannedDocument, source: &SourceDocument, relative_path: &str) -> String {
    let mut w = Writer { out: String::new() };
    let checksum = hash_bytes(source.content()).to_hex();
    let namespace = model
        .namespace
        .as_ref()
        .map_or(DEFAULT_NAMESPACE, |(ns, _)| ns.as_str());

    w.line(0, &format!("#pragma checksum \"{relative_path}\" \"{{blake3}}\" \"{checksum}\""));
    w.line(0, &format!("namespace {namespace}"));
    w.line(0, "{");
    for (using, span) in &model.usings {
        w.mapped(1, span.as_ref(), &format!("using {using};"));
    }

    if let Some(route) = &model.route {
        w.line(1, &format!("[RazorPage(\"{}\")]", escape(route)));
    }
    for tag_helper in &model.tag_helpers {
        w.line(1, &format!("[AddTagHelper(\"{}\")]", escape(tag_helper)));
    }

    let (base_type, base_span) = model.base_type();
    w.mapped(1, base_span, &format!("public class {} : {base_type}", class_name(relative_path)));
    w.line(1, "{");

    if let Some(prefix) = &model.tag_helper_prefix {
        w.line(2, &format!("public const string TagHelperPrefix = \"{}\";", escape(prefix)));
    }
    let model_type = model.model_type();
    for (type_name, name, span) in &model.injects {
        let type_name = substitute_model(type_name, model_type);
        w.mapped(2, span.as_ref(), &format!("[RazorInject] public {type_name} {name} {{ get; private set; }}"));
    }

    w.line(2, "public override async Task ExecuteAsync()");
    w.line(2, "{");
    for (_, text) in template.markup.iter().filter(|(_, text)| !text.trim().is_empty()) {
        w.line(3, &format!("WriteLiteral(\"{}\");", escape(text)));
    }
    w.line(2, "}");
    w.line(1, "}");
    w.line(0, "}");
    w.out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::options::DEFAULT_IMPORTS;

    fn code(source: &str, imports: &[(&str, &str)]) -> CodeDocument {
        let mut docs = vec![SourceDocument::clone(&DEFAULT_IMPORTS)];
        docs.extend(
            imports
                .iter()
                .map(|(path, content)| SourceDocument::new(Some(path.to_string()), *content)),
        );
        CodeDocument::new(
            SourceDocument::new(Some("/Views/Home/Index.cshtml".into()), source),
            docs,
            "/Views/Home/Index.cshtml",
        )
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("/Views/Home/Index.cshtml"), "Views_Home_Index");
        assert_eq!(class_name("/Pages/my-page.cshtml"), "Pages_my_page");
        assert_eq!(class_name("/404.cshtml"), "_404");
    }

    #[test]
    fn test_generates_default_view() {
        let generated = DirectiveEngine.generate(&code("<h1>Hello</h1>", &[]));
        assert!(generated.diagnostics.is_empty());
        let out = &generated.generated_code;
        assert!(out.starts_with("#pragma checksum \"/Views/Home/Index.cshtml\""));
        assert!(out.contains("namespace AspNetCore\n"));
        assert!(out.contains("    using System.Linq;\n"));
        assert!(out.contains("public class Views_Home_Index : Microsoft.AspNetCore.Mvc.Razor.RazorPage<dynamic>"));
        assert!(out.contains("[RazorInject] public Microsoft.AspNetCore.Mvc.Rendering.IHtmlHelper<dynamic> Html"));
        assert!(out.contains("WriteLiteral(\"<h1>Hello</h1>\");"));
    }

    #[test]
    fn test_template_overrides_imports() {
        let generated = DirectiveEngine.generate(&code(
            "@model HomeModel\n@inject IClock Clock",
            &[("/Views/_ViewImports.cshtml", "@model Ignored\n@inject ISystemClock Clock\n@namespace App.Views")],
        ));
        let out = &generated.generated_code;
        assert!(out.contains("namespace App.Views\n"));
        assert!(out.contains("RazorPage<HomeModel>"));
        assert!(out.contains("[RazorInject] public IClock Clock"));
        assert!(!out.contains("ISystemClock"));
        assert!(out.contains("IHtmlHelper<HomeModel> Html"));
    }

    #[test]
    fn test_line_pragmas() {
        let generated = DirectiveEngine.generate(&code(
            "<p></p>\n  @inject IClock Clock",
            &[("/Views/_ViewImports.cshtml", "@using App.Models")],
        ));
        let out = &generated.generated_code;
        assert!(out.contains("#line (1,1)-(1,18) \"/Views/_ViewImports.cshtml\"\n    using App.Models;\n#line default\n"));
        assert!(out.contains("#line (2,3)-(2,23) \"/Views/Home/Index.cshtml\"\n"));
    }

    #[test]
    fn test_page_and_tag_helpers() {
        let generated = DirectiveEngine.generate(&code(
            "@page \"/about\"",
            &[("/Views/_ViewImports.cshtml", "@addTagHelper *, App\n@addTagHelper *, Other\n@removeTagHelper *, Other\n@tagHelperPrefix th:")],
        ));
        let out = &generated.generated_code;
        assert!(out.contains("[RazorPage(\"/about\")]"));
        assert!(out.contains("[AddTagHelper(\"*, App\")]"));
        assert!(!out.contains("*, Other"));
        assert!(out.contains("TagHelperPrefix = \"th:\""));
        assert!(out.contains(": Microsoft.AspNetCore.Mvc.RazorPages.Page"));
    }

    #[test]
    fn test_errors_short_circuit() {
        let generated = DirectiveEngine.generate(&code(
            "@{",
            &[("/Views/_ViewImports.cshtml", "@page")],
        ));
        assert!(generated.generated_code.is_empty());
        assert_eq!(generated.diagnostics.len(), 2);
        assert_eq!(
            generated.diagnostics[0].location.file_path.as_deref(),
            Some("/Views/_ViewImports.cshtml")
        );
        assert!(generated.diagnostics[1].location.file_path.is_none());
    }

    #[test]
    fn test_checksum_tracks_source() {
        let a = DirectiveEngine.generate(&code("<p>a</p>", &[])).generated_code;
        let b = DirectiveEngine.generate(&code("<p>b</p>", &[])).generated_code;
        assert_ne!(a.lines().next(), b.lines().next());
    }
}
