// Config -> client -> pipeline failure paths
use serde_json::json;
use serial_test::serial;
use std::io::Write;

use trendsmith::config::{Config, Provider};
use trendsmith::error::GenerationError;
use trendsmith::features::niches::NicheRequest;
use trendsmith::features::NicheSearch;
use trendsmith::features::FeatureKind;
use trendsmith::llm::factory;
use trendsmith::pipeline::generator::Generator;

#[test]
fn test_unknown_provider_in_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[llm]\nprovider = \"carrier-pigeon\"").unwrap();
    let result = Config::load_with_path(Some(file.path().to_string_lossy().to_string()));
    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn test_missing_api_key_fails_each_request_not_startup() {
    let mut config = Config::default();
    config.llm.api_key_env = Some("TRENDSMITH_TEST_NONEXISTENT_KEY_12345".to_string());
    let client = factory::create_client(&config.llm, false).unwrap();
    let generator = Generator::new(client);

    for _ in 0..2 {
        let err = generator
            .generate::<NicheSearch>(&NicheRequest {
                topic: Some("cooking".to_string()),
            })
            .await
            .unwrap_err();
        match err {
            GenerationError::Configuration(msg) => {
                assert_eq!(msg, "TRENDSMITH_TEST_NONEXISTENT_KEY_12345 is not set")
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}

#[tokio::test]
#[serial]
async fn test_validation_precedes_missing_key() {
    let mut config = Config::default();
    config.llm.api_key_env = Some("TRENDSMITH_TEST_NONEXISTENT_KEY_67890".to_string());
    let generator = Generator::new(factory::create_client(&config.llm, false).unwrap());
    let err = generator
        .generate_json(FeatureKind::HashtagSet, json!({"keyword": "  "}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Keyword is required");
}

#[tokio::test]
async fn test_openai_compatible_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", mockito::Matcher::Missing)
        .match_body(mockito::Matcher::PartialJson(json!({
            "model": "llama3",
            "max_tokens": 1024
        })))
        .with_status(200)
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "Try these: #homecooking #mealprep #foodtok"}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut config = Config::default();
    config.llm.provider = Provider::OpenAICompatible;
    config.llm.model = "llama3".to_string();
    config.llm.api_key_env = Some("none".to_string());
    config.llm.base_url = Some(server.url());

    let generator = Generator::new(factory::create_client(&config.llm, false).unwrap());
    let out = generator
        .generate_json(FeatureKind::HashtagSet, json!({"keyword": "cooking"}))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        out,
        json!({"hashtags": ["#homecooking", "#mealprep", "#foodtok"]})
    );
}

#[tokio::test]
async fn test_upstream_error_body_kept_as_text_when_not_json() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let mut config = Config::default();
    config.llm.provider = Provider::OpenAICompatible;
    config.llm.api_key_env = Some("none".to_string());
    config.llm.base_url = Some(server.url());

    let generator = Generator::new(factory::create_client(&config.llm, false).unwrap());
    let err = generator
        .generate_json(FeatureKind::ContentIdea, json!({"niche": "gardening"}))
        .await
        .unwrap_err();
    match err {
        GenerationError::Upstream { status, details } => {
            assert_eq!(status, Some(502));
            assert_eq!(details, json!("Bad Gateway"));
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}
