//! Page construction on top of the compilation cache.
//!
//! - [`PageFactoryProvider`]: view path → factory producing page instances
//! - [`PageLoader`]: page action → compiled page type

mod factory;
mod loader;

pub use factory::{PageFactory, PageFactoryProvider, PageFactoryResult};
pub use loader::{PageActionDescriptor, PageLoadError, PageLoader};

/// A page instance.
pub trait RazorPage: Send {
    fn type_name(&self) -> &str;

    /// Path of the template the page was created for.
    fn path(&self) -> &str;

    fn set_path(&mut self, path: String);
}

/// Creates instances of a compiled page type.
pub trait PageActivator: Send + Sync {
    fn type_name(&self) -> &str;

    fn activate(&self) -> Box<dyn RazorPage>;
}
