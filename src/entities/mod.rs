//! Typed views of orchestrator resources and local input files

pub mod cluster;
pub mod host;
pub mod osprofile;
pub mod region;

pub use cluster::TemplateRef;
pub use host::HostImportRecord;
pub use osprofile::OsProfileManifest;
pub use region::{Region, ResourceRef, Site};
