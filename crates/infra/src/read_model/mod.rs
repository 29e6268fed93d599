//! Disposable read model storage.

pub mod keyed_store;

pub use keyed_store::{InMemoryKeyedStore, KeyedStore};
