pub mod search;

#[cfg(target_arch = "wasm32")]
mod geolocate;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
pub use app::*;
