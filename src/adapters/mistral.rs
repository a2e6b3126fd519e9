use crate::config::toml_config::MistralConfig;
use crate::domain::model::{BirdCandidate, SuggestionSet, MAX_CANDIDATES};
use crate::domain::ports::SpeciesSuggester;
use crate::utils::error::{FinderError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions client that asks for the five most likely species.
pub struct MistralSuggester {
    client: Client,
    api_key: String,
    config: MistralConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Why a single model attempt did not produce suggestions.
enum Attempt {
    /// Try the next model.
    Skip(String),
    /// Give up on the whole request.
    Fatal(FinderError),
}

impl MistralSuggester {
    pub fn new(api_key: String, config: MistralConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn try_model(&self, model: &str, prompt: &str) -> std::result::Result<Vec<BirdCandidate>, Attempt> {
        let payload = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Attempt::Skip("request timed out".to_string())
                } else {
                    Attempt::Skip(format!("failed to call Mistral API: {}", e))
                }
            })?;

        let status = response.status();
        match status {
            // 模型不存在或不支援，換下一個
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(Attempt::Skip(format!("model unavailable (HTTP {})", status.as_u16())));
            }
            StatusCode::UNAUTHORIZED => {
                return Err(Attempt::Fatal(FinderError::LlmRequestFailed {
                    message: "Invalid Mistral API key. Please check your API key.".to_string(),
                }));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Attempt::Fatal(FinderError::LlmRequestFailed {
                    message: "Mistral API rate limit exceeded. Please wait a moment and try again."
                        .to_string(),
                }));
            }
            // 其他錯誤不重試
            s if !s.is_success() => {
                return Err(Attempt::Fatal(FinderError::LlmRequestFailed {
                    message: format!("Mistral API error (HTTP {})", s.as_u16()),
                }));
            }
            _ => {}
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Skip(format!("failed to parse Mistral API response: {}", e)))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Attempt::Skip("response contained no choices".to_string()))?;

        let candidates = parse_suggestions(content.trim());
        if candidates.is_empty() {
            return Err(Attempt::Skip("no species found in response".to_string()));
        }
        Ok(candidates)
    }
}

#[async_trait]
impl SpeciesSuggester for MistralSuggester {
    async fn suggest(
        &self,
        description: &str,
        location_context: &str,
        date_context: &str,
    ) -> Result<SuggestionSet> {
        if description.trim().is_empty() {
            return Err(FinderError::InvalidInput {
                field: "description".to_string(),
                message: "Bird description cannot be empty".to_string(),
            });
        }

        let prompt = build_prompt(description, location_context, date_context);
        let mut last_reason = String::from("no models configured");

        for model in &self.config.models {
            tracing::debug!("Requesting suggestions from {}", model);
            match self.try_model(model, &prompt).await {
                Ok(candidates) => {
                    return Ok(SuggestionSet {
                        candidates,
                        model_used: model.clone(),
                    });
                }
                Err(Attempt::Skip(reason)) => {
                    tracing::warn!("⚠️ Model {} did not answer: {}", model, reason);
                    last_reason = reason;
                }
                Err(Attempt::Fatal(e)) => return Err(e),
            }
        }

        Err(FinderError::LlmRequestFailed {
            message: format!(
                "Could not get valid response from any Mistral model: {}",
                last_reason
            ),
        })
    }
}

pub fn build_prompt(description: &str, location_context: &str, date_context: &str) -> String {
    let mut context_parts = Vec::new();
    if !location_context.is_empty() {
        context_parts.push(format!("Location: {}", location_context));
    }
    if !date_context.is_empty() {
        context_parts.push(format!("Date: {}", date_context));
    }
    let context = context_parts.join("\n");

    format!(
        r#"You are an expert ornithologist. Based on the bird description below, identify the top 5 most likely SPECIFIC bird species.

IMPORTANT: Return SPECIFIC species names, not generic groups. For example:
- Use "Carolina Wren" NOT just "Wren"
- Use "American Robin" NOT just "Robin"
- Use "Northern Cardinal" NOT just "Cardinal"
- Use "Blue Jay" NOT just "Jay"

Return your response in this EXACT format (one species per line):
1. Common Name | Scientific Name
2. Common Name | Scientific Name
3. Common Name | Scientific Name
4. Common Name | Scientific Name
5. Common Name | Scientific Name

Bird Description: {}
{}

Top 5 bird species:"#,
        description, context
    )
}

const SKIPPED_LINE_MARKERS: [&str; 5] = ["description:", "location:", "date:", "top 5", "important:"];
const INSTRUCTION_WORDS: [&str; 4] = ["format", "example", "important", "return"];

/// Parse `N. Common Name | Scientific Name` lines, tolerating free-form answers.
pub fn parse_suggestions(content: &str) -> Vec<BirdCandidate> {
    let patterns = &*PATTERNS;

    let mut names: Vec<(String, Option<String>)> = Vec::new();
    for line in content.lines() {
        if names.len() == MAX_CANDIDATES {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if SKIPPED_LINE_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }

        let cleaned = patterns.numbering.replace(line, "");
        let cleaned = cleaned.trim();

        if let Some((common, scientific)) = cleaned.split_once('|') {
            let common = patterns.common_junk.replace_all(common.trim(), "").trim().to_string();
            // 學名只保留 Genus species
            let scientific = scientific.split('|').next().unwrap_or_default();
            let scientific = patterns
                .scientific_junk
                .replace_all(scientific.trim(), "")
                .trim()
                .to_string();
            if common.chars().count() > 2 {
                names.push((common, Some(scientific).filter(|s| !s.is_empty())));
                continue;
            }
        }

        let head = patterns.separators.split(cleaned).next().unwrap_or_default();
        let common = patterns.common_junk.replace_all(head.trim(), "").trim().to_string();
        let common_lower = common.to_lowercase();
        if common.chars().count() > 2 && !INSTRUCTION_WORDS.iter().any(|w| common_lower.contains(w)) {
            names.push((common, None));
        }
    }

    names
        .into_iter()
        .enumerate()
        .map(|(i, (common_name, scientific_name))| BirdCandidate {
            common_name,
            scientific_name,
            llm_rank: (i + 1) as u8,
        })
        .collect()
}

struct SuggestionPatterns {
    numbering: Regex,
    common_junk: Regex,
    scientific_junk: Regex,
    separators: Regex,
}

static PATTERNS: Lazy<SuggestionPatterns> = Lazy::new(|| SuggestionPatterns {
    numbering: Regex::new(r"^\d+[.)]\s*").unwrap(),
    common_junk: Regex::new(r"[^\w\s-]").unwrap(),
    scientific_junk: Regex::new(r"[^\w\s]").unwrap(),
    separators: Regex::new(r"[,:;]").unwrap(),
});
