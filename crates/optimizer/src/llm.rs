//! LLM proposer over an OpenAI-compatible chat completions API.

use crate::error::ProposalError;
use crate::proposer::{Proposal, ProposalContext, Proposer};
use crate::response::parse_response;
use anyhow::Result;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};
use tuneforge_options::format::render;
use tuneforge_options::{KeyKind, Schema, Section};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const SYSTEM_PROMPT: &str = "You are a RocksDB performance tuning assistant. \
    Respond only with a JSON object in the requested format.";

/// Calls a chat completions endpoint and reads the answer as a proposal.
pub struct LlmProposer {
    api_endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    /// Number of past iterations shown in the prompt.
    history_window: usize,
    agent: ureq::Agent,
}

impl LlmProposer {
    /// Create from environment variables.
    /// Expects: TUNEFORGE_LLM_API_KEY, optionally TUNEFORGE_LLM_ENDPOINT and TUNEFORGE_LLM_MODEL
    pub fn from_env() -> Result<Self> {
        let api_endpoint =
            std::env::var("TUNEFORGE_LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let api_key = std::env::var("TUNEFORGE_LLM_API_KEY")
            .map_err(|_| anyhow::anyhow!("TUNEFORGE_LLM_API_KEY not set"))?;
        let model = std::env::var("TUNEFORGE_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        Ok(Self::new(api_endpoint, api_key, model))
    }

    /// Create with explicit configuration.
    pub fn new(api_endpoint: String, api_key: String, model: String) -> Self {
        Self {
            api_endpoint,
            api_key,
            model,
            max_tokens: 2048,
            history_window: 8,
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(180))
                .build(),
        }
    }

    pub fn with_history_window(mut self, iterations: usize) -> Self {
        self.history_window = iterations.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// User prompt for one proposal request.
    pub fn build_prompt(&self, ctx: &ProposalContext<'_>) -> String {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "You are tuning RocksDB options to maximise db_bench throughput (ops/sec) \
             for the \"{}\" workload. Propose the next change.\n",
            ctx.test_name
        );

        prompt.push_str("SYSTEM:\n");
        prompt.push_str(&ctx.system.describe());

        prompt.push_str("\nWORKLOAD:\n");
        let args: Vec<String> = ctx.bench_args.to_flags();
        let _ = writeln!(
            prompt,
            "- db_bench arguments: {}",
            if args.is_empty() { "(defaults)".into() } else { args.join(" ") }
        );
        let _ = writeln!(
            prompt,
            "- Last run used {:.1}% CPU and {:.1} MB resident memory on average",
            ctx.usage.avg_cpu_percent, ctx.usage.avg_memory_mb
        );
        if let Some(trace) = ctx.trace {
            prompt.push_str(&trace.describe());
        }

        prompt.push_str("\nHISTORY (most recent last, * marks the best so far):\n");
        if ctx.history.is_empty() {
            prompt.push_str("(no completed runs)\n");
        } else {
            prompt.push_str(&ctx.history.summary(self.history_window));
        }

        prompt.push_str("\nCURRENT OPTIONS:\n");
        prompt.push_str(&render(ctx.current));

        prompt.push_str("\nCONSTRAINED KEYS:\n");
        for spec in Schema::rocksdb().keys() {
            if matches!(spec.kind, KeyKind::Enum(_)) {
                let _ = writeln!(prompt, "- {}.{}: {}", spec.section, spec.name, spec.kind.describe());
            }
        }

        let _ = write!(
            prompt,
            r#"
RULES:
- Change only keys that appear in CURRENT OPTIONS, using the same section names ({sections}).
- Change a few keys at a time and explain why, referring to the history.
- Do not repeat a configuration that already failed or regressed.
- "bench_args" may override db_bench flags for the next run; omit it to keep them.

Respond with ONLY valid JSON in this exact format (no markdown, no explanation):
{{
  "options": {{
    "db_options": {{"max_background_jobs": 4}},
    "cf_options": {{"write_buffer_size": 134217728}}
  }},
  "bench_args": {{}},
  "reasoning": "Brief explanation"
}}"#,
            sections = Section::ALL
                .iter()
                .filter(|s| **s != Section::Version)
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        prompt
    }

    fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProposalError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": temperature,
            "max_tokens": self.max_tokens
        });

        let response = self
            .agent
            .post(&self.api_endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(&request_body)
            .map_err(|e| ProposalError::Transport(e.to_string()))?;

        let body: serde_json::Value = response
            .into_json()
            .map_err(|e| ProposalError::Transport(e.to_string()))?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(ProposalError::NoContent)
    }
}

impl Proposer for LlmProposer {
    fn name(&self) -> &str {
        "llm"
    }

    fn propose(&self, ctx: &ProposalContext<'_>, temperature: f64) -> Result<Proposal, ProposalError> {
        let prompt = self.build_prompt(ctx);
        info!(model = %self.model, temperature, prompt_chars = prompt.len(), "querying reasoning service");
        debug!(%prompt, "proposal prompt");

        let content = self.complete(&prompt, temperature)?;
        match parse_response(&content, Schema::rocksdb()) {
            Ok(proposal) => {
                info!(keys = proposal.delta.len(), "received proposal");
                Ok(proposal)
            }
            Err(e) => {
                warn!(error = %e, content = %content, "unusable reasoning service response");
                Err(e)
            }
        }
    }
}
