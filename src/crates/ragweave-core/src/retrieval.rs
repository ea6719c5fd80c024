//! Document-retrieval collaborator interface

use crate::error::Result;
use crate::state::Document;
use async_trait::async_trait;
use tracing::warn;

/// Options forwarded to the retrieval backend
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum candidates to return
    pub limit: usize,

    /// Drop candidates scoring below this threshold, when set
    pub min_relevance: Option<f64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_relevance: None,
        }
    }
}

/// Search backend the retrieval nodes consume
///
/// The engine does not define the ranking algorithm, only this contract.
/// Implementations should return an error on backend failure; the pipeline
/// call site maps failures to an empty result set via [`search_or_empty`].
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(
        &self,
        user_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Document>>;
}

/// Search, degrading a backend failure to zero candidates
pub async fn search_or_empty(
    retriever: &dyn Retriever,
    user_id: &str,
    query: &str,
    options: &SearchOptions,
) -> Vec<Document> {
    match retriever.search(user_id, query, options).await {
        Ok(docs) => docs,
        Err(error) => {
            warn!(error = %error, "retrieval failed, continuing with no documents");
            Vec::new()
        }
    }
}
