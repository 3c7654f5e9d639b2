use super::SourceError;
use crate::models::chain::{format_pct, format_usd};
use crate::models::{Snapshot, WeeklyAnalysis};
use crate::services::comparator;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-sonnet-4-20250514";
const MAX_BULLETS: usize = 3;

/// Produces the weekly three-bullet commentary from a snapshot and its
/// week-ago counterpart. Lives behind a trait so the weekly job can run
/// without a configured generator.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(
        &self,
        current: &Snapshot,
        previous: Option<&Snapshot>,
    ) -> Result<WeeklyAnalysis, SourceError>;
}

pub struct ClaudeNarrative {
    client: Client,
    api_key: String,
}

impl ClaudeNarrative {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap(),
            api_key,
        }
    }
}

#[async_trait]
impl NarrativeGenerator for ClaudeNarrative {
    async fn generate(
        &self,
        current: &Snapshot,
        previous: Option<&Snapshot>,
    ) -> Result<WeeklyAnalysis, SourceError> {
        let prompt = build_prompt(current, previous);

        let body = serde_json::json!({
            "model": MODEL,
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": prompt}],
        });

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if resp.status() == 429 {
            return Err(SourceError::RateLimit);
        }
        if !resp.status().is_success() {
            return Err(SourceError::Network(format!(
                "messages API returned {}",
                resp.status()
            )));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        let text = data["content"][0]["text"].as_str().unwrap_or("");

        Ok(WeeklyAnalysis {
            timestamp: Utc::now(),
            bullets: parse_bullets(text),
        })
    }
}

/// Chain rankings with week-over-week movement, one line per chain, plus the
/// totals line. This is the data block the model analyzes.
pub fn build_comparison_report(current: &Snapshot, previous: Option<&Snapshot>) -> String {
    let mut lines = vec!["Chain Rankings by Stable TVL:".to_string(), String::new()];

    for (record, delta) in comparator::snapshot_deltas(current, previous) {
        let change = match delta {
            Some(d) => format!(
                " | WoW: {:+.1}% TVL, {:+.1}pp Util",
                d.tvl_change_percent, d.util_change_points
            ),
            None => String::new(),
        };
        lines.push(format!(
            "{}. {}: Stable TVL {}, Util {}, Stbl/DeFi {}{}",
            record.rank,
            record.chain,
            format_usd(record.stable_tvl),
            format_pct(record.util_percent),
            format_pct(record.stbl_defi_percent),
            change
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "TOTALS: Stable TVL {}, Util {}, Stbl/DeFi {}",
        format_usd(current.totals.stable_tvl),
        format_pct(current.totals.util_percent),
        format_pct(current.totals.stbl_defi_percent)
    ));
    if let Some(change) = comparator::totals_tvl_change(current, previous) {
        lines.push(format!("Total WoW Change: {:+.1}%", change));
    }

    lines.join("\n")
}

fn build_prompt(current: &Snapshot, previous: Option<&Snapshot>) -> String {
    format!(
        "You are an analyst covering capital markets onchain with a focus on \
         lending and stablecoins.\n\n\
         Analyze this weekly stablecoin flow data across DeFi protocols. \
         Generate exactly 3 bullet points highlighting the most interesting \
         insights.\n\n\
         Focus on:\n\
         1. Week-over-week changes (what moved significantly?)\n\
         2. Notable outliers (anything unusual or surprising?)\n\
         3. Trend narratives (what's the bigger picture?)\n\n\
         Be specific with numbers. Be declarative and confident. Avoid hype \
         or speculation.\n\n\
         Current Data ({}):\n{}\n\n\
         IMPORTANT: Return ONLY a JSON array with exactly 3 strings. No \
         markdown, no explanation, just the JSON array.",
        current.timestamp.date_naive(),
        build_comparison_report(current, previous)
    )
}

/// The model is asked for a JSON array but does not always comply. Try
/// strict JSON, then an array embedded in prose, then plain lines.
pub fn parse_bullets(text: &str) -> Vec<String> {
    let trimmed = text.trim();

    if let Ok(bullets) = serde_json::from_str::<Vec<String>>(trimmed) {
        return cap(bullets);
    }

    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            if let Ok(bullets) = serde_json::from_str::<Vec<String>>(&trimmed[start..=end]) {
                return cap(bullets);
            }
        }
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_BULLETS)
        .map(String::from)
        .collect()
}

fn cap(mut bullets: Vec<String>) -> Vec<String> {
    bullets.truncate(MAX_BULLETS);
    bullets
}
