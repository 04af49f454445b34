pub mod analysis;
pub mod client;
pub mod rerank;

pub use analysis::AiAnalysis;
pub use client::VisionClient;
