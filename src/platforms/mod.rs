pub use reelgrab_core::platforms::{is_long_form_youtube, Platform, RetrievalKind};

pub mod mirror;
pub mod provider;
pub mod traits;
pub mod youtube;
