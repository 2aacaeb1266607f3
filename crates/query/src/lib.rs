pub mod llm;
pub mod pipeline;
pub mod retriever;

pub use llm::{GeminiClient, GeminiConfig, LlmError};
pub use pipeline::{GraphRagPipeline, PipelineArtifacts, PipelineConfig};
pub use retriever::{GraphRetriever, RetrievalResult, EXPANSION_DECAY};
