//! Web search tool offered to the agent.
//!
//! The [`SearchTool`] trait is the only tool seam the agent knows about;
//! [`SerperSearch`] backs it with the Serper Google Search API.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::io::llm::ToolDefinition;

/// Tool name advertised to the model.
pub const SERPER_TOOL_NAME: &str = "search_the_internet_with_serper";

/// A search capability the agent can expose to the model as a function tool.
pub trait SearchTool {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run `query` and return results formatted as plain text for the model.
    fn search(&self, query: &str) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "search_query": {
                        "type": "string",
                        "description": "Mandatory search query you want to use to search the internet"
                    }
                },
                "required": ["search_query"]
            }),
        }
    }
}

/// Arguments the model passes to a search tool call.
#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub search_query: String,
}

/// Serper (`google.serper.dev`) search client.
pub struct SerperSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    results: usize,
}

impl SerperSearch {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        results: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            results,
        })
    }
}

impl SearchTool for SerperSearch {
    fn name(&self) -> &str {
        SERPER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "A tool that can be used to search the internet with a search_query."
    }

    #[instrument(skip(self), fields(results = self.results))]
    fn search(&self, query: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("SERPER_API_KEY is not set"))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&SerperRequest {
                q: query,
                num: self.results,
            })
            .send()
            .context("send serper request")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "serper search failed");
            return Err(anyhow!("serper api error {}: {text}", status.as_u16()));
        }

        let parsed: SerperResponse = response.json().context("parse serper response")?;
        debug!(organic = parsed.organic.len(), "serper search completed");
        Ok(format_results(&parsed, self.results))
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

/// Subset of the Serper response used to build tool output.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerperResponse {
    #[serde(default)]
    pub answer_box: Option<AnswerBox>,
    #[serde(default)]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnswerBox {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Render up to `limit` organic results (plus answer box / knowledge graph).
pub fn format_results(response: &SerperResponse, limit: usize) -> String {
    let mut out = String::new();

    if let Some(answer) = &response.answer_box {
        if let Some(text) = answer.answer.as_deref().or(answer.snippet.as_deref()) {
            let _ = writeln!(out, "Answer: {text}\n");
        }
    }
    if let Some(graph) = &response.knowledge_graph {
        if let Some(title) = &graph.title {
            let _ = writeln!(out, "Knowledge Graph: {title}");
            if let Some(description) = &graph.description {
                let _ = writeln!(out, "{description}");
            }
            out.push('\n');
        }
    }

    out.push_str("Search results:\n");
    let mut listed = 0;
    for result in response.organic.iter().take(limit) {
        let _ = writeln!(
            out,
            "Title: {}\nLink: {}\nSnippet: {}\n---",
            result.title, result.link, result.snippet
        );
        listed += 1;
    }
    if listed == 0 {
        out.push_str("(no results)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_organic_results_with_limit() {
        let response: SerperResponse = serde_json::from_value(json!({
            "searchParameters": { "q": "climate" },
            "organic": [
                { "title": "A", "link": "https://a.example", "snippet": "first", "position": 1 },
                { "title": "B", "link": "https://b.example", "snippet": "second", "position": 2 },
                { "title": "C", "link": "https://c.example", "snippet": "third", "position": 3 }
            ]
        }))
        .expect("parse");
        let text = format_results(&response, 2);
        assert!(text.contains("Title: A\nLink: https://a.example\nSnippet: first"));
        assert!(text.contains("Title: B"));
        assert!(!text.contains("Title: C"));
    }

    #[test]
    fn includes_answer_box_and_knowledge_graph() {
        let response: SerperResponse = serde_json::from_value(json!({
            "answerBox": { "snippet": "Warming is 1.2C" },
            "knowledgeGraph": { "title": "Climate change", "description": "Long-term shifts" },
            "organic": []
        }))
        .expect("parse");
        let text = format_results(&response, 5);
        assert!(text.starts_with("Answer: Warming is 1.2C"));
        assert!(text.contains("Knowledge Graph: Climate change\nLong-term shifts"));
        assert!(text.contains("(no results)"));
    }

    #[test]
    fn missing_key_fails_without_network() {
        let tool = SerperSearch::new(
            "http://127.0.0.1:9/search",
            None,
            5,
            Duration::from_secs(1),
        )
        .expect("tool");
        let err = tool.search("climate").unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }

    #[test]
    fn definition_requires_search_query() {
        let tool = SerperSearch::new(
            "http://127.0.0.1:9/search",
            Some("key".to_string()),
            5,
            Duration::from_secs(1),
        )
        .expect("tool");
        let def = tool.definition();
        assert_eq!(def.name, SERPER_TOOL_NAME);
        assert_eq!(def.parameters["required"][0], "search_query");
    }
}
