use parley::agent::FallbackOrchestrator;
use parley::config::CloudProviderConfig;
use parley::error::ChatError;
use parley::models::{ChatProvider, Message};
use parley::providers::{AnthropicProvider, GeminiProvider, OpenAIProvider, ORCHESTRATION_PREAMBLE};
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn with_server(mut config: CloudProviderConfig, server: &MockServer) -> CloudProviderConfig {
    config.base_url = server.uri();
    config.api_key = Some("test-key".to_string());
    config
}

fn conversation() -> Vec<Message> {
    vec![
        Message::user("What's the capital of Peru?"),
        Message::assistant("Lima."),
        Message::user("And its population?"),
    ]
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|m| m.to_string()).collect()
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn openai_sends_preamble_and_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "About 10 million." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::openai(), &server);
    let provider = OpenAIProvider::new(config).unwrap();
    let reply = assert_ok!(provider.send_chat(&conversation(), "gpt-4o-mini").await);

    assert_eq!(reply, "About 10 million.");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = received[0].body_json().unwrap();
    let wire = body["messages"].as_array().unwrap();
    assert_eq!(wire.len(), 4);
    assert_eq!(wire[0], json!({ "role": "system", "content": ORCHESTRATION_PREAMBLE }));
    assert_eq!(wire[2], json!({ "role": "assistant", "content": "Lima." }));
}

#[tokio::test]
async fn openai_non_success_status_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::openai(), &server);
    let provider = OpenAIProvider::new(config).unwrap();
    let err = provider.send_chat(&conversation(), "gpt-4o-mini").await.unwrap_err();

    assert!(matches!(err, ChatError::Provider(_)));
    assert!(err.to_string().contains("401"), "got: {err}");
}

#[tokio::test]
async fn anthropic_uses_system_field_and_version_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({ "max_tokens": 1024, "system": ORCHESTRATION_PREAMBLE })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "Roughly ten million people." }],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::anthropic(), &server);
    let provider = AnthropicProvider::new(config).unwrap();
    let reply = provider.send_chat(&conversation(), "claude-3-5-sonnet-20240620").await.unwrap();

    assert_eq!(reply, "Roughly ten million people.");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = received[0].body_json().unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert!(body["messages"].as_array().unwrap().iter().all(|m| m["role"] != "system"));
}

#[tokio::test]
async fn anthropic_missing_text_block_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::anthropic(), &server);
    let provider = AnthropicProvider::new(config).unwrap();
    let err = provider.send_chat(&conversation(), "claude").await.unwrap_err();

    assert_eq!(err.kind(), "ProviderError");
}

#[tokio::test]
async fn gemini_replays_history_before_final_user_turn() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-flash-latest:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "What's the capital of Peru?" }] },
                { "role": "model", "parts": [{ "text": "Lima." }] },
                { "role": "user", "parts": [{ "text": "And its population?" }] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("About 10 million.")))
        .expect(1)
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::gemini(), &server);
    let provider = GeminiProvider::new(config).unwrap();
    let reply = provider.send_chat(&conversation(), "gemini-flash-latest").await.unwrap();

    assert_eq!(reply, "About 10 million.");
}

#[tokio::test]
async fn gemini_rejects_sequence_not_ending_on_user() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::gemini(), &server);
    let provider = GeminiProvider::new(config).unwrap();
    let messages = [Message::user("hi"), Message::assistant("hello")];
    let err = provider.send_chat(&messages, "gemini-flash-latest").await.unwrap_err();

    assert!(matches!(err, ChatError::Protocol(_)));
}

#[tokio::test]
async fn gemini_fallback_walks_models_until_one_answers() {
    let server = MockServer::start().await;

    for dead in ["gemini-flash-latest", "gemini-1.5-flash"] {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", dead)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": format!("models/{} is not found", dead) }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-pro:generateContent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_reply("Hola desde gemini-pro")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::gemini(), &server);
    let gemini = GeminiProvider::new(config).unwrap();
    let fallbacks = models(&["gemini-1.5-flash", "gemini-pro", "gemini-flash-latest"]);
    let orchestrator = FallbackOrchestrator::new(gemini, fallbacks);

    let report = orchestrator.run(&[Message::user("hola")], "gemini-flash-latest").await;

    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.attempts(), 3);
    assert_eq!(report.into_result().unwrap(), "Hola desde gemini-pro");
}

#[tokio::test]
async fn gemini_fallback_exhaustion_summarizes_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let config = with_server(CloudProviderConfig::gemini(), &server);
    let gemini = GeminiProvider::new(config).unwrap();
    let fallbacks = models(&["gemini-1.5-flash", "gemini-pro"]);
    let orchestrator = FallbackOrchestrator::new(gemini, fallbacks);

    let err = orchestrator
        .send_chat(&[Message::user("hola")], "gemini-flash-latest")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Provider(_)));
    let text = err.to_string();
    assert!(text.starts_with("all models failed"), "got: {text}");
    assert!(text.contains("503"), "got: {text}");
}

#[tokio::test]
async fn gemini_without_key_never_reaches_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = CloudProviderConfig::gemini();
    config.base_url = server.uri();
    let gemini = GeminiProvider::new(config).unwrap();
    let orchestrator = FallbackOrchestrator::new(gemini, models(&["gemini-pro"]));

    let err = orchestrator
        .send_chat(&[Message::user("hola")], "gemini-flash-latest")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "GOOGLE_API_KEY is not configured");
}
