pub mod directives;
pub mod loader;
pub mod parser;

pub use directives::{CardField, Directive, SiteProfile};
pub use loader::{ProfileLoader, ProfileLoaderBuilder};
pub use parser::ProfileParser;
