use anyhow::Result;
use std::env;
use std::net::SocketAddr;

use crate::config::{missing_key_message, Config, LlmConfig, Provider};

struct CheckResult {
    passed: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            passed: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

pub fn run(config_path: Option<String>) -> Result<()> {
    let mut results = CheckResult::new();

    let config = match Config::load_with_path(config_path.clone()) {
        Ok(config) => {
            let source = config_path.as_deref().unwrap_or("default search path");
            results.pass(format!("Config loaded from {}", source));
            config
        }
        Err(e) => {
            results.error(format!("Failed to load config: {:#}", e));
            print_results(&results);
            anyhow::bail!("config could not be loaded");
        }
    };

    check(&config, &mut results);
    print_results(&results);

    if !results.errors.is_empty() {
        anyhow::bail!("{} config error(s) found", results.errors.len());
    }
    Ok(())
}

fn check(config: &Config, results: &mut CheckResult) {
    results.pass(format!(
        "LLM provider: {} (model: {})",
        config.llm.provider, config.llm.model
    ));

    check_api_key(&config.llm, results);

    if config.llm.provider == Provider::OpenAICompatible && config.llm.base_url.is_none() {
        results.warn(format!(
            "openai-compatible provider without base_url, using {}",
            config.llm.resolved_base_url()
        ));
    } else {
        results.pass(format!("Base URL: {}", config.llm.resolved_base_url()));
    }

    match config.llm.timeout_secs {
        0 => results.error("llm.timeout_secs must be greater than 0"),
        t if t < 10 => results.warn(format!(
            "llm.timeout_secs={} is very short for a 2048-token completion",
            t
        )),
        t => results.pass(format!("Oracle timeout: {}s", t)),
    }

    match config.server.host.parse::<SocketAddr>() {
        Ok(addr) => results.pass(format!("Server address: {}", addr)),
        Err(_) => results.warn(format!(
            "server.host '{}' is not an ip:port pair; it will be resolved at bind time",
            config.server.host
        )),
    }
}

fn check_api_key(llm: &LlmConfig, results: &mut CheckResult) {
    let env_var = llm.api_key_env_name();
    if env_var.eq_ignore_ascii_case("none") {
        if llm.provider.requires_key() {
            results.error(format!("API key: {}", missing_key_message(env_var)));
        } else {
            results.pass("API key: not needed");
        }
        return;
    }
    let is_oai_compat = llm.provider == Provider::OpenAICompatible;
    match env::var(env_var) {
        Ok(v) if !v.trim().is_empty() => results.pass(format!("API key: {} is set", env_var)),
        _ if is_oai_compat => results.warn(format!(
            "API key: {} is not set (OK for local models, needed for gateways)",
            env_var
        )),
        Ok(_) => results.error(format!("API key: {} is set but empty", env_var)),
        Err(_) => results.error(format!(
            "API key: {} is not set, every generation request will fail",
            env_var
        )),
    }
}

fn print_results(results: &CheckResult) {
    println!();
    for msg in &results.passed {
        println!("  \u{2713} {}", msg);
    }
    for msg in &results.warnings {
        println!("  ! {}", msg);
    }
    for msg in &results.errors {
        println!("  \u{2717} {}", msg);
    }
    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        results.passed.len(),
        results.warnings.len(),
        results.errors.len()
    );
}
