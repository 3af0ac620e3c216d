use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::fs;
use tracing::info;

use crate::config::Config;
use crate::features::FeatureKind;
use crate::llm::factory;
use crate::pipeline::generator::Generator;
use crate::server::error::ApiError;

/// Parse `key=value` pairs into a request body. Later duplicates win.
pub fn parse_params(params: &[String]) -> Result<Map<String, Value>> {
    let mut body = Map::new();
    for param in params {
        let (key, value) = param
            .split_once('=')
            .with_context(|| format!("invalid --param '{}', expected key=value", param))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --param '{}', key is empty", param);
        }
        body.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(body)
}

pub async fn run(
    feature: FeatureKind,
    params: Vec<String>,
    config_path: Option<String>,
    model_override: Option<String>,
    output: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let body = parse_params(&params)?;

    let mut config = Config::load_with_path(config_path)?;
    if let Some(model) = model_override {
        info!("CLI override: model = {}", model);
        config.llm.model = model;
    }
    info!(
        "Generating {} with {} ({}){}",
        feature,
        config.llm.provider,
        config.llm.model,
        if dry_run { " [dry run]" } else { "" }
    );

    let client = factory::create_client(&config.llm, dry_run)?;
    let generator = Generator::new(client);

    let result = match generator.generate_json(feature, Value::Object(body)).await {
        Ok(value) => value,
        Err(err) => {
            let api_error = ApiError::from_generation(feature, err);
            let body = serde_json::to_string_pretty(&api_error.body)?;
            eprintln!("{}", body);
            bail!("{} failed: {}", feature, api_error.body.error);
        }
    };

    let rendered = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            fs::write(&path, format!("{}\n", rendered))
                .with_context(|| format!("failed to write {}", path))?;
            info!("Wrote {}", path);
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
