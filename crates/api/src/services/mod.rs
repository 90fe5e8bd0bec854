//! External service integrations.

pub mod gemini;
pub mod image_fetch;
pub mod image_search;
pub mod prompts;
pub mod wardrobe_seed;

pub use gemini::GeminiStylist;
pub use image_fetch::{ImageFetchError, ImageFetcher};
pub use image_search::ImageSearchClient;
pub use wardrobe_seed::seed_default_wardrobe;
