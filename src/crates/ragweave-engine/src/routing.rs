//! Routing predicates: pure functions electing the next pipeline stage
//!
//! Routing reads the current [`AgentState`] and nothing else (no clocks,
//! no I/O, no randomness), so the same state always elects the same
//! transition. That determinism is what makes replay from a checkpoint and
//! table-driven testing possible.

use ragweave_core::AgentState;

/// Where execution goes after the retrieval stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieveRoute {
    /// Result set is empty or low-relevance and widening has not run yet
    Widen,
    /// A registered tool looks applicable to the query
    Tool,
    /// Proceed straight to answer synthesis
    Generate,
}

/// Where execution goes after the tool-router stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRoute {
    RunTool,
    Generate,
}

/// Whether the query names a registered tool
///
/// A tool is "indicated" when the query mentions its name (underscores
/// read as spaces). The router node still confirms the election with the
/// reasoning model; this predicate only gates whether that step runs.
pub fn tool_indicated(query: &str, tool_names: &[String]) -> bool {
    let query = query.to_lowercase();
    tool_names.iter().any(|name| {
        let name = name.to_lowercase();
        query.contains(&name) || query.contains(&name.replace('_', " "))
    })
}

/// Elect the stage following retrieval
///
/// Widening wins when the result set is unsatisfactory and the widen latch
/// is clear; it is elected at most once per run. After that, a tool
/// indication routes through the tool branch, otherwise synthesis.
pub fn route_after_retrieve(
    state: &AgentState,
    tool_names: &[String],
    min_relevance: f64,
) -> RetrieveRoute {
    let best_score = state
        .docs
        .iter()
        .map(|d| d.metadata.relevance_score)
        .fold(f64::NEG_INFINITY, f64::max);
    let unsatisfactory = state.docs.is_empty() || best_score < min_relevance;

    if unsatisfactory && !state.tasks.widened {
        return RetrieveRoute::Widen;
    }

    let query = state.effective_query().unwrap_or_default();
    if tool_indicated(query, tool_names) {
        return RetrieveRoute::Tool;
    }

    RetrieveRoute::Generate
}

/// Elect the stage following the tool router
pub fn route_after_tool(state: &AgentState) -> ToolRoute {
    if state.tasks.selected_tool.is_some() {
        ToolRoute::RunTool
    } else {
        ToolRoute::Generate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragweave_core::{Document, DocumentMetadata, Message, ToolSelection};
    use serde_json::json;

    fn doc(score: f64) -> Document {
        Document {
            id: "d1".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            metadata: DocumentMetadata {
                source: "corpus".to_string(),
                url: None,
                relevance_score: score,
            },
        }
    }

    fn state_with_query(query: &str) -> AgentState {
        AgentState::new("u1").with_message(Message::user(query))
    }

    #[test]
    fn test_empty_docs_elect_widen() {
        let state = state_with_query("anything");
        assert_eq!(
            route_after_retrieve(&state, &[], 0.35),
            RetrieveRoute::Widen
        );
    }

    #[test]
    fn test_low_relevance_elects_widen() {
        let mut state = state_with_query("anything");
        state.docs = vec![doc(0.1)];
        assert_eq!(
            route_after_retrieve(&state, &[], 0.35),
            RetrieveRoute::Widen
        );
    }

    #[test]
    fn test_widen_elected_at_most_once() {
        let mut state = state_with_query("anything");
        state.tasks.widened = true;
        assert_eq!(
            route_after_retrieve(&state, &[], 0.35),
            RetrieveRoute::Generate
        );
    }

    #[test]
    fn test_good_docs_elect_generate() {
        let mut state = state_with_query("anything");
        state.docs = vec![doc(0.9)];
        assert_eq!(
            route_after_retrieve(&state, &[], 0.35),
            RetrieveRoute::Generate
        );
    }

    #[test]
    fn test_tool_indication_routes_to_tool() {
        let mut state = state_with_query("please add 2 and 3");
        state.docs = vec![doc(0.9)];
        let tools = vec!["add".to_string()];
        assert_eq!(
            route_after_retrieve(&state, &tools, 0.35),
            RetrieveRoute::Tool
        );
    }

    #[test]
    fn test_underscored_tool_names_match_spaced_queries() {
        assert!(tool_indicated(
            "run a web search for rust",
            &["web_search".to_string()]
        ));
        assert!(!tool_indicated("tell me a joke", &["web_search".to_string()]));
    }

    #[test]
    fn test_routing_is_deterministic() {
        let mut state = state_with_query("please add 2 and 3");
        state.docs = vec![doc(0.9)];
        let tools = vec!["add".to_string()];

        let first = route_after_retrieve(&state, &tools, 0.35);
        let second = route_after_retrieve(&state, &tools, 0.35);
        assert_eq!(first, second);
    }

    #[test]
    fn test_route_after_tool() {
        let mut state = state_with_query("anything");
        assert_eq!(route_after_tool(&state), ToolRoute::Generate);

        state.tasks.selected_tool = Some(ToolSelection {
            name: "add".to_string(),
            input: json!({"a": 2, "b": 3}),
        });
        assert_eq!(route_after_tool(&state), ToolRoute::RunTool);
    }
}
