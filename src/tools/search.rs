//! `search` tool (§4.6 default tool set): web search via DuckDuckGo. No API
//! key required — matches the "missing credentials degrade gracefully"
//! ethos of the rest of the stack, since this tool never depends on one.
//! Tries the Instant Answer API first, falling back to HTML scraping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::tools::traits::{Tool, ToolResult, Visualization};
use crate::tools::urlencoding;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct DuckDuckGoResponse {
    #[serde(rename = "AbstractText")]
    abstract_text: Option<String>,
    #[serde(rename = "AbstractURL")]
    abstract_url: Option<String>,
    #[serde(rename = "AbstractSource")]
    abstract_source: Option<String>,
    #[serde(rename = "Heading")]
    heading: Option<String>,
    #[serde(rename = "RelatedTopics")]
    related_topics: Option<Vec<DuckDuckGoTopic>>,
    #[serde(rename = "Results")]
    results: Option<Vec<DuckDuckGoResult>>,
}

#[derive(Debug, Deserialize)]
struct DuckDuckGoTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DuckDuckGoResult {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct SearchTool {
    client: Client,
    visualization: Visualization,
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTool {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("cad-agent-core/1.0")
            .build()
            .expect("failed to build search HTTP client");

        SearchTool {
            client,
            visualization: Visualization::with_stages(&[
                ("calling", "[searching: {query}]"),
                ("success", "[search returned {count} result(s) for: {query}]"),
                ("error", "[search failed: {error}]"),
            ]),
        }
    }

    async fn search_instant_answer(&self, query: &str, count: u8) -> Result<Vec<SearchResult>> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::Error::Provider(format!("DuckDuckGo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(crate::Error::Provider(format!(
                "DuckDuckGo search failed with status {}",
                response.status()
            )));
        }

        let ddg_response: DuckDuckGoResponse = response
            .json()
            .await
            .map_err(|e| crate::Error::Provider(format!("Failed to parse DuckDuckGo response: {}", e)))?;

        let mut results = Vec::new();
        let max_results = count as usize;

        if let (Some(text), Some(url), Some(source)) = (
            &ddg_response.abstract_text,
            &ddg_response.abstract_url,
            &ddg_response.abstract_source,
        ) {
            if !text.is_empty() {
                results.push(SearchResult {
                    title: ddg_response.heading.clone().unwrap_or_else(|| source.clone()),
                    url: url.clone(),
                    snippet: text.clone(),
                });
            }
        }

        if let Some(direct_results) = ddg_response.results {
            for r in direct_results.into_iter().take(max_results.saturating_sub(results.len())) {
                if let (Some(text), Some(url)) = (r.text, r.first_url) {
                    results.push(SearchResult {
                        title: text.chars().take(100).collect(),
                        url,
                        snippet: text,
                    });
                }
            }
        }

        if let Some(topics) = ddg_response.related_topics {
            for topic in topics.into_iter().take(max_results.saturating_sub(results.len())) {
                if let (Some(text), Some(url)) = (topic.text, topic.first_url) {
                    let title = text.split(" - ").next().unwrap_or(&text).to_string();
                    results.push(SearchResult { title, url, snippet: text });
                }
            }
        }

        Ok(results)
    }

    async fn search_html(&self, query: &str, count: u8) -> Result<Vec<SearchResult>> {
        let url = format!("https://html.duckduckgo.com/html/?q={}", urlencoding::encode(query));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::Error::Provider(format!("DuckDuckGo HTML request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(crate::Error::Provider(format!(
                "DuckDuckGo HTML search failed with status {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| crate::Error::Provider(format!("Failed to read DuckDuckGo response: {}", e)))?;

        let mut results = Vec::new();
        let max_results = count as usize;

        for (i, chunk) in html.split("class=\"result__a\"").skip(1).enumerate() {
            if i >= max_results {
                break;
            }

            let url = chunk.split("href=\"").nth(1).and_then(|s| s.split('"').next()).map(|s| {
                if s.contains("uddg=") {
                    s.split("uddg=")
                        .nth(1)
                        .and_then(|u| urlencoding::decode(u).ok())
                        .unwrap_or_else(|| s.to_string())
                } else {
                    s.to_string()
                }
            });

            let title = chunk
                .split('>')
                .nth(1)
                .and_then(|s| s.split('<').next())
                .map(html_decode);

            let snippet = chunk
                .split("class=\"result__snippet\"")
                .nth(1)
                .and_then(|s| s.split('>').nth(1))
                .and_then(|s| s.split('<').next())
                .map(html_decode);

            if let (Some(url), Some(title)) = (url, title) {
                if !url.is_empty() && !title.is_empty() {
                    results.push(SearchResult {
                        title,
                        url,
                        snippet: snippet.unwrap_or_default(),
                    });
                }
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web using DuckDuckGo. Returns relevant web pages with titles, URLs, and snippets. No API key required."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "count": {
                    "type": "integer",
                    "description": "Number of results to return (1-10, default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _db: Option<&sqlx::PgPool>) -> Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'query' parameter".to_string()))?;

        let count = args
            .get("count")
            .and_then(|v| v.as_u64())
            .map(|c| c.min(10) as u8)
            .unwrap_or(5);

        let results = match self.search_instant_answer(query, count).await {
            Ok(r) if !r.is_empty() => r,
            _ => self.search_html(query, count).await.unwrap_or_default(),
        };

        Ok(ToolResult::ok(serde_json::json!({
            "query": query,
            "count": results.len(),
            "results": results,
        })))
    }

    fn visualization(&self) -> Option<&Visualization> {
        Some(&self.visualization)
    }
}

fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_name_matches_default_tool_set_entry() {
        let tool = SearchTool::new();
        assert_eq!(tool.name(), "search");
    }

    #[test]
    fn html_decode_handles_common_entities() {
        assert_eq!(html_decode("Hello &amp; World"), "Hello & World");
        assert_eq!(html_decode("&lt;tag&gt;"), "<tag>");
    }

    #[test]
    fn visualization_renders_calling_stage() {
        let tool = SearchTool::new();
        let viz = tool.visualization().unwrap();
        assert_eq!(viz.stages.get("calling").unwrap(), "[searching: {query}]");
    }
}
