//! The six pipeline nodes
//!
//! Each node is a pure function from the current state (plus injected
//! collaborators) to a [`StateDelta`]; nothing here touches the running
//! state. Collaborator failures never escape a node: LLM timeouts fall
//! back to the raw query or the fixed apology, retrieval failures read as
//! zero documents, and tool problems arrive as failed `ToolResult`s from
//! the secure executor. A node returning `Err` is still safe (the wrapper
//! in `ragweave-core` contains it), but the nodes below reserve errors for
//! genuinely malformed runs.

use crate::executor::GraphExecutor;
use ragweave_core::{
    call_with_timeout, search_or_empty, AgentState, EngineError, LlmOptions, Message, Result,
    SearchOptions, StateDelta, TokenCounts, ToolOutcome, ToolSelection,
};
use serde_json::json;
use tracing::{debug, warn};

pub(crate) const NODE_SPLIT_REWRITE: &str = "split_rewrite";
pub(crate) const NODE_RETRIEVE: &str = "retrieve";
pub(crate) const NODE_DYNAMIC_WIDEN: &str = "dynamic_widen";
pub(crate) const NODE_TOOL_ROUTER: &str = "tool_router";
pub(crate) const NODE_RUN_TOOL: &str = "run_tool";
pub(crate) const NODE_GENERATE_ANSWER: &str = "generate_answer";

/// Whitespace-based token estimate
///
/// The collaborator interface returns plain text without usage reporting,
/// so accounting here is an approximation; providers that report exact
/// usage belong to the collaborator layer.
fn estimate_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Strip exact-phrase quoting and `field:value` filter tokens from a query
fn relax_query(query: &str) -> String {
    query
        .replace('"', " ")
        .split_whitespace()
        .filter(|token| !token.contains(':'))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the router model's verdict into a tool selection
///
/// Accepts a JSON object (possibly surrounded by prose) with a `tool` name
/// and optional `input`; anything else, including the literal `none`,
/// reads as "no tool".
fn parse_tool_verdict(response: &str) -> Option<ToolSelection> {
    let trimmed = response.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().starts_with("none") {
        return None;
    }

    let start = trimmed.find('{')?;
    let mut values = serde_json::Deserializer::from_str(&trimmed[start..])
        .into_iter::<serde_json::Value>();
    let value = values.next()?.ok()?;

    let name = value.get("tool")?.as_str()?.to_string();
    let input = value.get("input").cloned().unwrap_or_else(|| json!({}));
    Some(ToolSelection { name, input })
}

impl GraphExecutor {
    /// Normalize and rewrite the raw query, using prior turns for
    /// disambiguation. On LLM failure the raw query is kept; a run never
    /// stalls on the rewrite.
    pub(crate) async fn node_split_rewrite(&self, state: &AgentState) -> Result<StateDelta> {
        let query = state
            .latest_user_message()
            .ok_or_else(|| EngineError::Validation("run has no user message".to_string()))?
            .to_string();

        let rewritten = match tokio::time::timeout(
            self.config.llm_timeout,
            self.llm.rewrite_query(&query, &state.messages),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
                warn!("query rewrite unavailable, keeping raw query");
                query.clone()
            }
        };

        let mut delta = StateDelta::new().with_rewritten_query(rewritten);

        match tokio::time::timeout(self.config.llm_timeout, self.llm.analyze_complexity(&query))
            .await
        {
            Ok(Ok(assessment)) if assessment.should_split && !assessment.suggested_queries.is_empty() => {
                debug!(
                    sub_queries = assessment.suggested_queries.len(),
                    "query flagged for splitting"
                );
                delta = delta.with_sub_queries(assessment.suggested_queries);
            }
            _ => {}
        }

        Ok(delta)
    }

    /// Fetch candidate documents for the effective query
    pub(crate) async fn node_retrieve(&self, state: &AgentState) -> Result<StateDelta> {
        let Some(query) = state.effective_query() else {
            return Ok(StateDelta::new().with_docs(Vec::new()));
        };

        let options = SearchOptions {
            limit: state.options.max_context_docs,
            min_relevance: None,
        };
        let mut docs =
            search_or_empty(self.retriever.as_ref(), &state.user_id, query, &options).await;
        docs.truncate(state.options.max_context_docs);

        debug!(count = docs.len(), "retrieval finished");
        Ok(StateDelta::new().with_docs(docs))
    }

    /// Relax retrieval constraints after an unsatisfactory result set
    ///
    /// Uses the complexity analysis's sub-queries when available, otherwise
    /// strips quoting and filter tokens from the query. Sets the widen
    /// latch so routing never elects a second pass.
    pub(crate) async fn node_dynamic_widen(&self, state: &AgentState) -> Result<StateDelta> {
        let base = state.effective_query().unwrap_or_default();

        let widened = if !state.tasks.sub_queries.is_empty() {
            state.tasks.sub_queries.join(" ")
        } else {
            relax_query(base)
        };
        let widened = if widened.trim().is_empty() {
            base.to_string()
        } else {
            widened
        };

        debug!(query = %widened, "retrieval constraints relaxed");
        Ok(StateDelta::new().with_rewritten_query(widened).with_widened())
    }

    /// Ask the reasoning model whether a registered tool should run
    ///
    /// Absent, unparseable or unknown-tool verdicts all route onward to
    /// answer synthesis.
    pub(crate) async fn node_tool_router(&self, state: &AgentState) -> Result<StateDelta> {
        if self.tools.is_empty() {
            return Ok(StateDelta::new());
        }
        let query = state.effective_query().unwrap_or_default().to_string();

        let prompt = format!(
            "You route user requests to tools.\nAvailable tools:\n{}\n\nIf one of these tools \
             should run for the request below, respond with JSON \
             {{\"tool\": \"<name>\", \"input\": {{...}}}}. Otherwise respond with the word none.",
            self.tools.catalog()
        );
        let messages = vec![Message::system(prompt), Message::user(query)];
        let options = LlmOptions {
            max_tokens: 256,
            temperature: 0.0,
        };

        let Some(response) =
            call_with_timeout(self.llm.as_ref(), &messages, &options, self.config.llm_timeout)
                .await
        else {
            return Ok(StateDelta::new());
        };

        match parse_tool_verdict(&response) {
            Some(selection) if self.tools.has(&selection.name) => {
                debug!(tool = %selection.name, "tool elected");
                Ok(StateDelta::new().with_selected_tool(selection))
            }
            Some(selection) => {
                warn!(tool = %selection.name, "router elected an unregistered tool, ignoring");
                Ok(StateDelta::new())
            }
            None => Ok(StateDelta::new()),
        }
    }

    /// Execute the elected tool through the secure executor
    pub(crate) async fn node_run_tool(&self, state: &AgentState, run_id: &str) -> Result<StateDelta> {
        let Some(selection) = state.tasks.selected_tool.clone() else {
            return Ok(StateDelta::new());
        };

        let result = self
            .tool_executor
            .execute(&selection.name, selection.input, run_id)
            .await;
        Ok(StateDelta::new().push_tool_result(result))
    }

    /// Synthesize the final answer from messages, documents and tool results
    ///
    /// The terminal node cannot fail the run: synthesis failure or timeout
    /// substitutes the fixed apology string.
    pub(crate) async fn node_generate_answer(&self, state: &AgentState) -> Result<StateDelta> {
        let mut context = String::new();

        if state.options.context_enhancement && !state.docs.is_empty() {
            context.push_str("Relevant documents:\n");
            for doc in &state.docs {
                context.push_str(&format!("[{}] {}\n{}\n", doc.id, doc.title, doc.body));
            }
        }
        for result in &state.tasks.tool_results {
            match &result.outcome {
                ToolOutcome::Success(output) => {
                    context.push_str(&format!("Tool {} returned: {}\n", result.tool_name, output));
                }
                ToolOutcome::Failure(error) => {
                    context.push_str(&format!("Tool {} failed: {}\n", result.tool_name, error));
                }
            }
        }

        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        if !context.is_empty() {
            messages.push(Message::system(format!(
                "Answer the user's request. Use this context where it helps:\n\n{}",
                context
            )));
        }
        messages.extend(state.messages.iter().cloned());

        let options = LlmOptions {
            max_tokens: state.options.max_tokens,
            temperature: state.options.temperature,
        };
        let text =
            call_with_timeout(self.llm.as_ref(), &messages, &options, self.config.llm_timeout)
                .await
                .unwrap_or_else(|| ragweave_core::FALLBACK_ANSWER.to_string());

        let token_counts = TokenCounts {
            prompt: messages.iter().map(|m| estimate_tokens(&m.content)).sum(),
            completion: estimate_tokens(&text),
        };

        Ok(StateDelta::new()
            .with_generated_text(text.clone())
            .push_message(Message::assistant(text))
            .with_token_counts(token_counts)
            .mark_final())
    }
}
