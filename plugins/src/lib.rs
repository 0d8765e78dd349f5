pub mod extractor;
pub mod factory;
pub mod host;
