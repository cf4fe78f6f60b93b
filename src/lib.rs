//! razor-views: compile Razor templates once, recompile only when a
//! template or one of its imports changes.
//!
//! ```text
//! RazorProject ──▶ CompilationUnit ──▶ CompilationPipeline
//!      │                                      │
//!   tokens                                    ▼
//!      └────────────────────────────▶ CompilerCache ──▶ PageFactoryProvider
//!                                                   └─▶ PageLoader
//! ```

pub mod cache;
pub mod cli;
pub mod compilation;
pub mod config;
pub mod freshness;
pub mod logger;
pub mod page;
pub mod project;
pub mod utils;
pub mod watch;
