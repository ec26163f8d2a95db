//! Project-side inputs of a compile pass: build metadata, the ordered
//! classpath derived from it, Java source discovery and encoded reads.

pub mod classpath;
mod metadata;
mod source;
mod walk;

pub use classpath::assemble;
pub use metadata::{Dependency, ProjectMetadata};
pub use source::{read_source, Encoding};
pub use walk::{java_sources, visit};
