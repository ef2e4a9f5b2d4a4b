pub mod completion;
pub mod cross_encoder;
pub mod pipeline;
pub mod prompt;
pub mod reranker;
pub mod retriever;
pub mod synthesizer;

pub use completion::MistralChat;
pub use cross_encoder::CrossEncoderScorer;
pub use pipeline::{PipelineState, PipelineStatus, RagPipeline};
pub use reranker::Reranker;
pub use retriever::Retriever;
pub use synthesizer::Synthesizer;
