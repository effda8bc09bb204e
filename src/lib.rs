pub mod config;
pub mod covers;
pub mod curator;
pub mod enrich;
pub mod error;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod server;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::covers::{CoverLookup, GoogleBooksLookup};
use crate::curator::Curator;
use crate::enrich::Enricher;
use crate::error::Result;
use crate::prompt::PromptBuilder;
use crate::transport::{GeminiTransport, Transport};

/// Wires the production clients from configuration. Called once at start-up;
/// the resulting curator is shared by every request.
pub fn curator_from_config(cfg: &Config) -> Result<Curator> {
    let transport = Arc::new(GeminiTransport::new(&cfg.gemini)?);
    let covers = Arc::new(GoogleBooksLookup::new(&cfg.books));

    let enricher = Enricher::new(
        covers as Arc<dyn CoverLookup>,
        cfg.retail.search_url.clone(),
    );

    let curator = Curator::new(
        transport as Arc<dyn Transport>,
        PromptBuilder::new(cfg.generation.output_language.clone()),
        enricher,
        cfg.generation.response_shape,
    )
    .with_temperature(cfg.gemini.temperature);

    Ok(curator)
}
