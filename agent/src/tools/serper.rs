use crate::Result;
use crate::llm::Message;
use crate::tools::{FunctionalTool, ToolCall, ToolDefinition};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const DEFAULT_RESULTS: usize = 10;

#[derive(Clone)]
pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    n_results: usize,
}

impl SerperSearch {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: SERPER_ENDPOINT.to_string(),
            n_results: DEFAULT_RESULTS,
        })
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn n_results(mut self, n: usize) -> Self {
        self.n_results = n.max(1);
        self
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        debug!(query, "serper search");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.n_results,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        Ok(response)
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub answer_box: Option<AnswerBox>,
    pub knowledge_graph: Option<KnowledgeGraph>,
    pub organic: Vec<OrganicResult>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct AnswerBox {
    pub title: Option<String>,
    pub answer: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct KnowledgeGraph {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct OrganicResult {
    pub title: String,
    pub link: String,
    pub snippet: Option<String>,
}

impl SearchResponse {
    pub fn format(&self, limit: usize) -> String {
        let mut blocks = Vec::new();

        if let Some(answer) = &self.answer_box {
            let text = answer
                .answer
                .as_deref()
                .or(answer.snippet.as_deref())
                .unwrap_or_default();
            if !text.is_empty() {
                let mut block = format!("Answer: {}", text);
                if let Some(link) = &answer.link {
                    block.push_str(&format!("\nLink: {}", link));
                }
                blocks.push(block);
            }
        }

        if let Some(graph) = &self.knowledge_graph {
            if let Some(title) = &graph.title {
                let mut block = format!("Knowledge Graph: {}", title);
                if let Some(kind) = &graph.kind {
                    block.push_str(&format!(" ({})", kind));
                }
                if let Some(description) = &graph.description {
                    block.push_str(&format!("\n{}", description));
                }
                blocks.push(block);
            }
        }

        blocks.extend(self.organic.iter().take(limit).map(|result| {
            format!(
                "Title: {}\nLink: {}\nSnippet: {}",
                result.title,
                result.link,
                result.snippet.as_deref().unwrap_or_default()
            )
        }));

        if blocks.is_empty() {
            return "No results found.".to_string();
        }

        blocks.join("\n---\n")
    }
}

#[derive(Deserialize, JsonSchema)]
struct SearchArgs {
    /// mandatory search query you want to use to search the internet
    search_query: String,
}

#[async_trait]
impl FunctionalTool for SerperSearch {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<SearchArgs>(
            "search_the_internet",
            "a tool that can be used to search the internet with a search_query",
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: SearchArgs = call.args()?;
        let response = self.search(&args.search_query).await?;
        Ok(call.result(response.format(self.n_results)))
    }
}
