//! Event dispatch implementations.

mod memory;

pub use memory::InMemoryEventBus;
