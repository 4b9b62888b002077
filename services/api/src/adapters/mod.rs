pub mod image_gen;
pub mod postcard_raster;
pub mod recommend_llm;

pub use image_gen::GeminiImageAdapter;
pub use postcard_raster::RasterPostcardAdapter;
pub use recommend_llm::OpenAiRecommendationAdapter;
