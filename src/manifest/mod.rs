//! Manifest Rendering
//!
//! Produces the Deployment and Service documents for a cluster:
//! - Template: `${KEY}` YAML templates, built in or from a directory
//! - Values: the placeholder maps for each template

pub mod template;
pub mod values;

pub use template::*;
pub use values::*;
