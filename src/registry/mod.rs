//! Entity registry access.
//!
//! * [`EntityRecord`] / [`RegistryEntity`] — the `{id, name, sounds_like,
//!   active}` view of a registry entry.
//! * [`RegistrySource`] — async trait implemented by every source.
//! * [`DirectorySource`] / [`MemorySource`] — shipped implementations.
//! * [`RegistryError`] — error variants for source reads.

pub mod entity;
pub mod source;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use entity::{EntityRecord, EntityType, RegistryEntity};
pub use source::{DirectorySource, MemorySource, RegistryError, RegistrySource};
