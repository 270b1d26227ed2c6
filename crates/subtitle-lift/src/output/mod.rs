pub mod crops;
pub mod error;
pub mod json;

pub use crops::CropDumper;
pub use error::OutputError;
pub use json::write_cues_json;
