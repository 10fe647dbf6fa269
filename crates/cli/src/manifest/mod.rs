//! Query manifest handling.
//! Parses, interpolates, and validates the `queries.yaml` (or `.json`) file
//! that declares providers, cache settings, and queries.

mod io;
mod model;
mod validation;

pub use io::{default_manifest_path, load_manifest, load_manifest_from_path};
pub use model::{CacheConfig, Manifest, ManifestError, ProviderConfig, ProviderKind, QueryConfig};
pub use validation::validate_manifest;
