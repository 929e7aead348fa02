//! Embedded schemas and templates

pub mod registry;
pub mod template;
pub mod validator;

pub use registry::{ManifestKind, SchemaRegistry};
pub use template::{CloudInitContext, TemplateGenerator};
pub use validator::{load_manifest, ManifestError, Validator};
