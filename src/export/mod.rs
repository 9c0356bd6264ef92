//! Model persistence
//!
//! A trained model is stored as one bincode blob holding the classifier, the
//! fitted preprocessor and a metadata header. Saving and loading always handle
//! the pair together.

mod bundle;

pub use bundle::{load, save, BundleMetadata, ModelBundle, FORMAT_VERSION};
