pub mod center;
pub mod info;
pub mod view;

#[cfg(target_arch = "wasm32")]
pub mod google;

pub use center::*;
pub use info::*;
pub use view::*;
