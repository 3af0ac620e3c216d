use std::sync::Arc;

use crate::llm::client::LlmClient;
use crate::pipeline::generator::Generator;

/// Shared, read-only handler state. The oracle client holds the API key.
#[derive(Clone)]
pub struct AppState {
    pub generator: Generator,
}

impl AppState {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            generator: Generator::new(client),
        }
    }
}
