//! Directive scanner.
//!
//! Recognises the line-level directives (`@using`, `@inject`, `@model`, ...)
//! and tracks code blocks well enough to report unbalanced braces. Markup
//! and expressions are passed through untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::compilation::document::SourceDocument;
use crate::compilation::engine::{RazorError, SourceLocation};

static RE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\s*)@(using|inject|model|inherits|namespace|page|addTagHelper|removeTagHelper|tagHelperPrefix)\b(.*)$",
    )
    .unwrap()
});

static RE_CODE_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(\{|functions\b|if\b|for\b|foreach\b|while\b|switch\b|using\s*\()").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Using,
    Inject,
    Model,
    Inherits,
    Namespace,
    Page,
    AddTagHelper,
    RemoveTagHelper,
    TagHelperPrefix,
}

impl DirectiveKind {
    fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "using" => Self::Using,
            "inject" => Self::Inject,
            "model" => Self::Model,
            "inherits" => Self::Inherits,
            "namespace" => Self::Namespace,
            "page" => Self::Page,
            "addTagHelper" => Self::AddTagHelper,
            "removeTagHelper" => Self::RemoveTagHelper,
            "tagHelperPrefix" => Self::TagHelperPrefix,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Using => "using",
            Self::Inject => "inject",
            Self::Model => "model",
            Self::Inherits => "inherits",
            Self::Namespace => "namespace",
            Self::Page => "page",
            Self::AddTagHelper => "addTagHelper",
            Self::RemoveTagHelper => "removeTagHelper",
            Self::TagHelperPrefix => "tagHelperPrefix",
        }
    }

    /// Directives that may appear at most once per file.
    fn is_single(self) -> bool {
        matches!(self, Self::Model | Self::Inherits | Self::Page | Self::Namespace)
    }

    /// `@page` takes an optional route; everything else needs a value.
    fn requires_value(self) -> bool {
        !matches!(self, Self::Page)
    }
}

/// A directive occurrence with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub value: String,
    /// Zero-based line.
    pub line: usize,
    /// Zero-based column of the `@`.
    pub column: usize,
    /// Zero-based column just past the directive.
    pub end_column: usize,
}

/// Directives, markup lines and errors of one source document.
#[derive(Debug, Default)]
pub struct ScannedDocument {
    pub directives: Vec<Directive>,
    /// `(zero-based line, text)` of every non-directive line.
    pub markup: Vec<(usize, String)>,
    pub errors: Vec<RazorError>,
}

/// Open code block being tracked.
struct Block {
    depth: usize,
    opened: bool,
    /// Where the opener was seen, reported if never closed.
    location: SourceLocation,
}

/// Scan a document. `error_path` is attached to every error (`None` for the
/// template being compiled).
pub fn scan(document: &SourceDocument, error_path: Option<&str>, is_import: bool) -> ScannedDocument {
    let mut scanned = ScannedDocument::default();
    let mut block: Option<Block> = None;
    let mut offset = 0;

    let location = |absolute: usize, line: usize, column: usize| {
        SourceLocation::new(error_path.map(str::to_string), absolute, line, column)
    };

    for (line_index, line) in document.content().split('\n').enumerate() {
        let text = line.strip_suffix('\r').unwrap_or(line);

        if block.is_none()
            && let Some(caps) = RE_DIRECTIVE.captures(text)
            && !caps[3].trim_start().starts_with('(')
        {
            let column = caps[1].chars().count();
            let kind = DirectiveKind::parse(&caps[2]).unwrap_or(DirectiveKind::Using);
            let value = caps[3].trim().to_string();
            let end_column = text.trim_end().chars().count();
            let here = location(offset + column, line_index, column);

            if let Some(error) = validate(&scanned, kind, &value, is_import) {
                scanned
                    .errors
                    .push(RazorError::new(error, here, end_column - column));
            } else {
                scanned.directives.push(Directive {
                    kind,
                    value: strip_quotes(&value).to_string(),
                    line: line_index,
                    column,
                    end_column,
                });
            }
        } else {
            track_blocks(text, 0, offset, line_index, &mut block, &location);
            scanned.markup.push((line_index, text.to_string()));
        }

        offset += line.chars().count() + 1;
    }

    if let Some(block) = block {
        scanned.errors.push(RazorError::new(
            "The code block is missing a closing \"}\" character. Make sure you have a matching \"}\" character for all the \"{\" characters within this block.",
            block.location,
            1,
        ));
    }

    scanned
}

fn validate(scanned: &ScannedDocument, kind: DirectiveKind, value: &str, is_import: bool) -> Option<String> {
    let keyword = kind.keyword();

    if kind == DirectiveKind::Page && is_import {
        return Some("The 'page' directive is not allowed in import files.".to_string());
    }
    if kind.requires_value() && value.is_empty() {
        return Some(format!("The '{keyword}' directive expects a value."));
    }
    if kind == DirectiveKind::Inject && value.rsplit_once(char::is_whitespace).is_none() {
        return Some("The 'inject' directive expects a type name followed by a property name.".to_string());
    }
    if kind.is_single() && scanned.directives.iter().any(|d| d.kind == kind) {
        return Some(format!("Only one '{keyword}' statement is allowed in a file."));
    }
    None
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// `user@if.example` is an address, not a code block.
fn follows_word(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric())
}

/// Character column of a byte index.
#[inline]
fn char_column(text: &str, byte_index: usize) -> usize {
    text[..byte_index].chars().count()
}

/// Update brace depth for code blocks on this line, starting at byte `from`.
/// `offset` is the character offset of the line in the document.
fn track_blocks<F>(
    text: &str,
    from: usize,
    offset: usize,
    line: usize,
    block: &mut Option<Block>,
    location: &F,
) where
    F: Fn(usize, usize, usize) -> SourceLocation,
{
    let mut start = from;

    if block.is_none() {
        let Some(opener) = RE_CODE_OPENER
            .find_iter(text)
            .find(|m| m.start() >= from && !follows_word(text, m.start()))
        else {
            return;
        };
        let column = char_column(text, opener.start());
        *block = Some(Block {
            depth: 0,
            opened: false,
            location: location(offset + column, line, column),
        });
        start = opener.start() + 1;
    }

    let mut chars = text.char_indices().skip_while(|(i, _)| *i < start);
    while let Some((index, ch)) = chars.next() {
        let Some(current) = block.as_mut() else {
            // Closed on this line: look for another opener in the rest.
            track_blocks(text, index, offset, line, block, location);
            return;
        };
        match ch {
            '"' | '\'' => {
                // Skip string and char literals.
                let mut escaped = false;
                for (_, c) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == ch {
                        break;
                    }
                }
            }
            '{' => {
                current.depth += 1;
                current.opened = true;
            }
            '}' => {
                current.depth = current.depth.saturating_sub(1);
                if current.opened && current.depth == 0 {
                    *block = None;
                }
            }
            _ => {}
        }
    }
}
