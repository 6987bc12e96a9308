mod loader;
mod types;

pub use loader::ConfigLoader;
