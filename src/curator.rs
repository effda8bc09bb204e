use futures::future::join_all;
use std::sync::Arc;
use tracing::Instrument;

use crate::enrich::Enricher;
use crate::error::{Result, SchemaError};
use crate::models::{Filters, GeminiRequest, Mode, ResultSet, ResultShape};
use crate::normalize::normalize_reply;
use crate::prompt::PromptBuilder;
use crate::transport::Transport;

/// Upper bound on results per generation. Shortfalls are not padded.
pub const MAX_RESULTS: usize = 5;

/// Drives one generation: prompt, model call, normalization, enrichment.
pub struct Curator {
    tx: Arc<dyn Transport>,
    prompts: PromptBuilder,
    enricher: Enricher,
    shape: ResultShape,
    temperature: Option<f32>,
}

impl Curator {
    pub fn new(
        tx: Arc<dyn Transport>,
        prompts: PromptBuilder,
        enricher: Enricher,
        shape: ResultShape,
    ) -> Self {
        Self {
            tx,
            prompts,
            enricher,
            shape,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    /// Always returns a result set. Upstream failures and unparseable
    /// replies are logged and come back as the empty set, indistinguishable
    /// from a generation that found nothing.
    pub async fn generate(&self, mode: Mode, query: &str, filters: Option<&Filters>) -> ResultSet {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("generate", %request_id, %mode);

        async {
            match self.try_generate(mode, query, filters).await {
                Ok(set) => {
                    tracing::info!("Generated {} results for '{}'", set.len(), query);
                    set
                }
                Err(e) => {
                    tracing::error!("Error generating ideas for '{}': {}", query, e);
                    ResultSet::empty(self.shape)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Same pipeline as [`Curator::generate`] but surfaces the failure.
    pub async fn try_generate(
        &self,
        mode: Mode,
        query: &str,
        filters: Option<&Filters>,
    ) -> Result<ResultSet> {
        let prompt = self.prompts.build(query, mode, filters);
        let request = GeminiRequest::json_prompt(prompt, self.temperature);

        let response = self.tx.generate_content(&request).await?;
        let text = response.text().ok_or_else(|| {
            SchemaError::Upstream("Gemini API returned no candidate text".to_string())
        })?;

        let reply = normalize_reply(&text)?.truncate(MAX_RESULTS);
        if reply.items.len() < MAX_RESULTS {
            tracing::info!(
                "Model returned {} of {} requested items",
                reply.items.len(),
                MAX_RESULTS
            );
        }

        // Fan out every lookup at once; join preserves model order.
        let results = join_all(
            reply
                .items
                .into_iter()
                .map(|item| self.enricher.enrich(item)),
        )
        .await;

        Ok(ResultSet::build(self.shape, reply.tags, results))
    }
}
