pub mod script;

pub use script::ScriptLogExtractor;
