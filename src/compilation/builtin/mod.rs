//! Built-in template engine and compiler backend.
//!
//! [`DirectiveEngine`] understands the directive layer of the template
//! language (imports, injection, model, page routes, tag helpers) and code
//! block structure; [`ManifestBackend`] validates the generated class and
//! produces a [`ManifestType`] describing it. Together they let the CLI
//! check a project without an external compiler.

mod backend;
mod directives;
mod engine;

pub use backend::{InjectedProperty, ManifestBackend, ManifestPage, ManifestType};
pub use directives::{Directive, DirectiveKind};
pub use engine::{DirectiveEngine, class_name};
