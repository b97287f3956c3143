pub mod machine;

#[cfg(target_arch = "wasm32")]
pub mod script;
#[cfg(target_arch = "wasm32")]
pub mod sdk;

pub use machine::*;
