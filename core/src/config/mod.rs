mod load;
mod types;

pub use load::{apply_env_overrides, load, load_from, locate};
pub use types::*;
