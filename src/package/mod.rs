//! Package identity and content model.
//!
//! Versions, identifiers, the on-disk descriptor, and the [`Package`]
//! value that knows how to materialize its contents.

mod descriptor;
mod identifier;
mod matcher;
mod model;
mod version;

pub use descriptor::{DESCRIPTOR_FILE, Descriptor};
pub use identifier::{PackageDependency, PackageIdentifier, PackageSpecifier};
pub use matcher::{MatchMode, PackageMatcher};
pub use model::{Package, PackageSource};
pub use version::Version;
