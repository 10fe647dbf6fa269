//! Shared type definitions for Fathom.
//!
//! This crate holds the provider-agnostic half of the system: the declarative
//! [`Query`] description, the capability tags used to match queries with data
//! providers, and the data shapes produced once a decoded payload has been
//! mapped ([`Collection`], [`Pagination`]).
//!
//! Nothing here performs I/O. Transport, caching, and orchestration live in
//! `fathom-engine`.

pub mod json_path;
mod mapping;
mod pagination;
mod query;

pub use json_path::{select_path, value_as_u64};
pub use mapping::{MappingError, PropertyMap};
pub use pagination::{Collection, Pagination, PaginationFields, PaginationSource};
pub use query::{Capability, Query, QueryKind};
