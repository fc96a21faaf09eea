pub mod loader;
pub mod splitter;
pub mod sync;
