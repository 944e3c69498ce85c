pub mod advisory;
pub mod providers;
pub mod types;

pub use advisory::{
    AdvisoryError, DEFAULT_FLUCTUATIONS, GUIDANCE_FAILED, PriceAdvisor, PriceGuidanceInput,
    PriceGuidanceOutput,
};
pub use providers::gemini::GeminiProvider;
pub use providers::{AiProvider, ProviderError};
pub use types::{ChatMessage, ChatRequest, ChatResponse, MessageRole, ResponseFormat};
