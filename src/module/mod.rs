//! Module metadata: descriptors, selection and image naming.
//!
//! A module is a directory under the modules root holding a `module.json`
//! descriptor and one Dockerfile per target architecture.

pub mod descriptor;
pub mod image;
pub mod select;

pub use descriptor::{ModuleDescriptor, Platform, DESCRIPTOR_FILE};
pub use image::ImageTarget;
pub use select::{list_modules, Selection, WILDCARD};

use std::fmt;

/// Language a module is written in. Drives builder selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    CSharp,
    Java,
    Python,
    NodeJs,
    C,
    /// Anything else. Rejected when a builder is resolved.
    Other(String),
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "csharp" | "c#" => Self::CSharp,
            "java" => Self::Java,
            "python" => Self::Python,
            "nodejs" | "node" => Self::NodeJs,
            "c" => Self::C,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CSharp => "csharp",
            Self::Java => "java",
            Self::Python => "python",
            Self::NodeJs => "nodejs",
            Self::C => "c",
            Self::Other(s) => s,
        };
        f.write_str(name)
    }
}
