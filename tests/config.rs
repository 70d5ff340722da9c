//! Tests for the properties store, the provider set, and effective-mode
//! resolution.

use std::io::Write;

use ghostwriter::config::{
    get_config, load_properties, resolve_mode, Properties, ProviderConfig, ProviderSet, Settings,
    WireStyle,
};
use ghostwriter::error::GhostwriterError;

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Properties file parsing
// ---------------------------------------------------------------------------

#[test]
fn properties_file_parses_comments_and_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# backend configuration").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "api.mode = openai").unwrap();
    writeln!(file, "openai.api.url=https://api.example.com/v1?a=b").unwrap();
    writeln!(file, "not a property line").unwrap();

    let props = load_properties(file.path());
    assert_eq!(props.get("api.mode").map(String::as_str), Some("openai"));
    // Only the first '=' splits key from value.
    assert_eq!(
        props.get("openai.api.url").map(String::as_str),
        Some("https://api.example.com/v1?a=b")
    );
    assert_eq!(props.len(), 2);
}

#[test]
fn missing_properties_file_yields_empty_store() {
    let props = load_properties("does-not-exist.properties");
    assert!(props.is_empty());
}

#[test]
fn get_config_prefers_file_over_env_over_default() {
    // SAFETY: test-only env mutation with a name no other test uses.
    unsafe { std::env::set_var("GW_TEST_PRECEDENCE_KEY", "from-env") };

    let with_file = props(&[("gw.test.precedence.key", "from-file")]);
    assert_eq!(
        get_config("gw.test.precedence.key", "fallback", &with_file),
        "from-file"
    );
    assert_eq!(
        get_config("gw.test.precedence.key", "fallback", &Properties::new()),
        "from-env"
    );
    assert_eq!(
        get_config("gw.test.unset.key", "fallback", &Properties::new()),
        "fallback"
    );
}

// ---------------------------------------------------------------------------
// Provider set construction and resolution
// ---------------------------------------------------------------------------

#[test]
fn builtin_modes_get_original_defaults() {
    let set = ProviderSet::from_properties(&Properties::new());
    assert_eq!(set.default_mode, "local");

    let local = set.get("local").unwrap();
    assert_eq!(local.endpoint_url, "http://localhost:11434/api/generate");
    assert_eq!(local.model_name, "deepseek-coder:6.7b");
    assert_eq!(local.wire_style, WireStyle::LocalGenerate);
    assert!(local.api_key.is_none());

    assert_eq!(set.get("openai").unwrap().model_name, "gpt-3.5-turbo");
    assert_eq!(set.get("gemini").unwrap().model_name, "gemini-2.5-flash");
}

#[test]
fn properties_override_builtin_defaults() {
    let set = ProviderSet::from_properties(&props(&[
        ("api.mode", "gemini"),
        ("local.model.name", "codellama:13b"),
        ("gemini.api.key", "g-key"),
    ]));
    assert_eq!(set.default_mode, "gemini");
    assert_eq!(set.get("local").unwrap().model_name, "codellama:13b");
    assert_eq!(set.get("gemini").unwrap().api_key.as_deref(), Some("g-key"));
}

#[test]
fn resolve_uses_default_when_no_override() {
    let set = ProviderSet::from_properties(&Properties::new());
    assert_eq!(set.resolve(None).unwrap().mode, "local");
    // Empty and whitespace-only overrides never win.
    assert_eq!(set.resolve(Some("")).unwrap().mode, "local");
    assert_eq!(set.resolve(Some("  ")).unwrap().mode, "local");
}

#[test]
fn resolve_honors_explicit_override() {
    let set = ProviderSet::from_properties(&props(&[("openai.api.key", "sk-test")]));
    assert_eq!(set.resolve(Some("openai")).unwrap().mode, "openai");
}

#[test]
fn legacy_token_mode_aliases_openai() {
    let set = ProviderSet::from_properties(&props(&[("openai.api.key", "sk-test")]));
    assert_eq!(set.resolve(Some("token")).unwrap().mode, "openai");
}

#[test]
fn unknown_mode_is_a_configuration_error() {
    let set = ProviderSet::from_properties(&Properties::new());
    let err = set.resolve(Some("mystery")).unwrap_err();
    assert!(matches!(
        err,
        GhostwriterError::Configuration { ref mode, .. } if mode == "mystery"
    ));
}

#[test]
fn missing_credential_is_a_configuration_error() {
    let set = ProviderSet::from_properties(&Properties::new());
    let err = set.resolve(Some("openai")).unwrap_err();
    match err {
        GhostwriterError::Configuration { mode, message } => {
            assert_eq!(mode, "openai");
            assert!(message.contains("key"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn manual_set_resolves_by_mode_key() {
    let set = ProviderSet::new(
        "local",
        vec![
            ProviderConfig {
                mode: "local".to_string(),
                endpoint_url: "http://localhost:11434/api/generate".to_string(),
                model_name: "local-model".to_string(),
                api_key: None,
                wire_style: WireStyle::LocalGenerate,
            },
            ProviderConfig {
                mode: "cloud".to_string(),
                endpoint_url: "https://cloud.example.com/v1".to_string(),
                model_name: "cloud-model".to_string(),
                api_key: Some("k".to_string()),
                wire_style: WireStyle::OpenAiChat,
            },
        ],
    );
    assert_eq!(set.resolve(Some("cloud")).unwrap().model_name, "cloud-model");
    assert_eq!(set.resolve(None).unwrap().model_name, "local-model");
    assert_eq!(set.mode_names(), vec!["cloud", "local"]);
}

// ---------------------------------------------------------------------------
// Client-side mode preference
// ---------------------------------------------------------------------------

#[test]
fn client_mode_precedence_is_explicit_then_preference() {
    assert_eq!(resolve_mode(Some("gemini"), Some("local")), Some("gemini"));
    assert_eq!(resolve_mode(None, Some("local")), Some("local"));
    assert_eq!(resolve_mode(None, None), None);
    assert_eq!(resolve_mode(Some(""), Some("local")), Some("local"));
    assert_eq!(resolve_mode(Some("  "), None), None);
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_defaults_match_original_backend() {
    let settings = Settings::default();
    assert_eq!(settings.chat_max_tokens, 512);
    assert_eq!(settings.completion_max_tokens, 128);
    assert_eq!(settings.completion_temperature, 0.0);
    assert_eq!(settings.file_context_max_chars, 4000);
    assert_eq!(settings.debounce.as_millis(), 2000);
    assert!(settings.chat_timeout > settings.completion_timeout);
}

#[test]
fn undersized_token_caps_are_floored() {
    let settings = Settings::from_properties(&props(&[
        ("completion.max.tokens", "8"),
        ("chat.max.tokens", "10"),
    ]));
    // Handlers clamp completion requests to [16, cap] and chat requests to
    // [64, 2*cap]; caps below those floors would invert the ranges.
    assert_eq!(settings.completion_max_tokens, 16);
    assert_eq!(settings.chat_max_tokens, 32);
}

#[test]
fn settings_read_from_properties() {
    let settings = Settings::from_properties(&props(&[
        ("chat.max.tokens", "1024"),
        ("completion.debounce.ms", "500"),
        ("completion.timeout.secs", "5"),
    ]));
    assert_eq!(settings.chat_max_tokens, 1024);
    assert_eq!(settings.debounce.as_millis(), 500);
    assert_eq!(settings.completion_timeout.as_secs(), 5);
}
