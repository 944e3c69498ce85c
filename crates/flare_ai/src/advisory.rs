//! Price advisory: asks the model whether a campaign should lock in the
//! current price of an asset.
//!
//! The request/response field set is declared once in [`INPUT_FIELDS`] and
//! [`OUTPUT_FIELDS`]. The prompt and the declared response format are
//! derived from those tables, and both the input and the model's answer are
//! checked against them.

use std::sync::Arc;

use anyhow::{Context, Result};
use flare_core::{ErrorCategory, Notice, NoticeVariant, StarterConfig, UserFacing};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::providers::gemini::GeminiProvider;
use crate::providers::{AiProvider, ProviderError};
use crate::types::{ChatMessage, ChatRequest, NamedSchema, ResponseFormat};

pub const GUIDANCE_FAILED: &str = "Failed to get AI guidance. Please try again.";
pub const DEFAULT_FLUCTUATIONS: &str =
    "The asset has seen moderate volatility over the last 7 days, with a recent upward trend.";

const SCHEMA_NAME: &str = "price_guidance";
const MAX_TOKENS: u32 = 1024;

// ---------------------------------------------------------------------------
// Field tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
}

impl FieldKind {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn admits(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

pub const INPUT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "assetName",
        label: "Asset Name",
        kind: FieldKind::String,
        description: "The name of the FAsset (e.g., F-BTC, F-XRP).",
    },
    FieldSpec {
        name: "currentPrice",
        label: "Current Price",
        kind: FieldKind::Number,
        description: "The current price of the FAsset.",
    },
    FieldSpec {
        name: "fundingGoal",
        label: "Funding Goal (USD)",
        kind: FieldKind::Number,
        description: "The funding goal of the campaign in USD.",
    },
    FieldSpec {
        name: "recentPriceFluctuations",
        label: "Recent Price Fluctuations",
        kind: FieldKind::String,
        description: "A description of recent price fluctuations for the FAsset.",
    },
];

pub const OUTPUT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "shouldUsePrice",
        label: "Should Use Price",
        kind: FieldKind::Boolean,
        description: "Whether the current price should be used.",
    },
    FieldSpec {
        name: "reasoning",
        label: "Reasoning",
        kind: FieldKind::String,
        description: "The AI reasoning behind the recommendation.",
    },
];

/// JSON schema object for a field table. Every field is required.
pub fn json_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| {
            (
                f.name.to_string(),
                json!({ "type": f.kind.json_type(), "description": f.description }),
            )
        })
        .collect();
    let required: Vec<&str> = fields.iter().map(|f| f.name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Check `value` against a field table the way [`json_schema`] declares it:
/// an object holding every field with the right type, and nothing else.
pub fn check_object(fields: &[FieldSpec], value: &Value) -> Result<(), String> {
    let object = value
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;
    for field in fields {
        match object.get(field.name) {
            None => return Err(format!("missing field `{}`", field.name)),
            Some(v) if !field.kind.admits(v) => {
                return Err(format!(
                    "field `{}` is not a {}",
                    field.name,
                    field.kind.json_type()
                ));
            }
            Some(_) => {}
        }
    }
    if let Some(extra) = object.keys().find(|k| !fields.iter().any(|f| f.name == k.as_str())) {
        return Err(format!("unexpected field `{extra}`"));
    }
    Ok(())
}

pub fn response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: NamedSchema {
            name: SCHEMA_NAME.into(),
            schema: json_schema(OUTPUT_FIELDS),
        },
    }
}

// ---------------------------------------------------------------------------
// Typed input / output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceGuidanceInput {
    pub asset_name: String,
    pub current_price: f64,
    pub funding_goal: f64,
    pub recent_price_fluctuations: String,
}

impl PriceGuidanceInput {
    /// Input with the default fluctuation description.
    pub fn new(asset_name: impl Into<String>, current_price: f64, funding_goal: f64) -> Self {
        Self {
            asset_name: asset_name.into(),
            current_price,
            funding_goal,
            recent_price_fluctuations: DEFAULT_FLUCTUATIONS.into(),
        }
    }

    pub fn with_fluctuations(mut self, text: impl Into<String>) -> Self {
        self.recent_price_fluctuations = text.into();
        self
    }

    /// Non-finite numbers serialize to `null` and fail the field table.
    fn check(&self) -> Result<(), AdvisoryError> {
        let value = serde_json::to_value(self)
            .map_err(|e| AdvisoryError::InvalidInput(e.to_string()))?;
        check_object(INPUT_FIELDS, &value).map_err(AdvisoryError::InvalidInput)?;
        if self.asset_name.trim().is_empty() {
            return Err(AdvisoryError::InvalidInput("asset name is empty".into()));
        }
        if self.current_price < 0.0 || self.funding_goal < 0.0 {
            return Err(AdvisoryError::InvalidInput("prices must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceGuidanceOutput {
    pub should_use_price: bool,
    pub reasoning: String,
}

impl PriceGuidanceOutput {
    pub fn title(&self) -> &'static str {
        if self.should_use_price {
            "Recommendation: Use Current Price"
        } else {
            "Recommendation: Consider Waiting"
        }
    }

    pub fn to_notice(&self) -> Notice {
        let variant = if self.should_use_price {
            NoticeVariant::Success
        } else {
            NoticeVariant::Default
        };
        Notice::new(variant, self.title()).with_description(self.reasoning.clone())
    }
}

// ---------------------------------------------------------------------------
// Prompt / validation
// ---------------------------------------------------------------------------

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the advisory prompt for `input`.
pub fn render_prompt(input: &PriceGuidanceInput) -> String {
    let values = serde_json::to_value(input).unwrap_or(Value::Null);
    let mut prompt = String::from(
        "You are an AI assistant helping users decide whether to use the current price \
         of an FAsset for their crowdfunding campaign.\n\n\
         Here is information about the current market situation:\n",
    );
    for field in INPUT_FIELDS {
        let value = values.get(field.name).map(render_value).unwrap_or_default();
        prompt.push_str(&format!("{}: {}\n", field.label, value));
    }
    prompt.push_str(
        "\nAnalyze the information provided and determine whether the user should use the \
         current price for their campaign or wait for a potentially better price.\n\n\
         Provide a clear and concise recommendation and explain your reasoning. \
         Respond with a single JSON object with these fields:\n",
    );
    for field in OUTPUT_FIELDS {
        prompt.push_str(&format!(
            "- {} ({}): {}\n",
            field.name,
            field.kind.json_type(),
            field.description
        ));
    }
    prompt
}

/// Strip a Markdown code fence the model may wrap its JSON in.
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Check the model's answer against [`OUTPUT_FIELDS`] and decode it.
pub fn validate(content: &str) -> Result<PriceGuidanceOutput, AdvisoryError> {
    let value: Value = serde_json::from_str(strip_fence(content))
        .map_err(|e| AdvisoryError::Malformed(format!("not JSON: {e}")))?;
    check_object(OUTPUT_FIELDS, &value).map_err(AdvisoryError::Malformed)?;

    let output: PriceGuidanceOutput = serde_json::from_value(value)
        .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
    if output.reasoning.trim().is_empty() {
        return Err(AdvisoryError::Malformed("reasoning is empty".into()));
    }
    Ok(output)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("Invalid advisory input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed advisory response: {0}")]
    Malformed(String),
}

impl UserFacing for AdvisoryError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::Provider(_) | Self::Malformed(_) => ErrorCategory::Service,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::Provider(_) | Self::Malformed(_) => GUIDANCE_FAILED.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

pub struct PriceAdvisor {
    provider: Arc<dyn AiProvider>,
    model: String,
}

impl PriceAdvisor {
    pub fn new(provider: Arc<dyn AiProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Gemini-backed advisor; fails when no API key is configured.
    pub fn from_config(config: &StarterConfig) -> Result<Self> {
        config
            .ai_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .with_context(|| {
                format!("AI API key not set ({})", flare_core::config::AI_API_KEY_ENV)
            })?;
        let provider = GeminiProvider::from_config(config);
        Ok(Self::new(Arc::new(provider), config.ai_model.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, input: &PriceGuidanceInput) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(render_prompt(input))],
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: None,
            system_prompt: None,
            response_format: Some(response_format()),
        }
    }

    /// One round-trip to the provider. Failures are returned as-is.
    pub async fn get_guidance(
        &self,
        input: &PriceGuidanceInput,
    ) -> Result<PriceGuidanceOutput, AdvisoryError> {
        input.check()?;
        let request = self.build_request(input);
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            asset = %input.asset_name,
            "requesting price guidance"
        );

        let response = self.provider.chat(&request).await.inspect_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "price guidance request failed");
        })?;

        validate(&response.content).inspect_err(|e| {
            warn!(error = %e, "price guidance response rejected");
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
