//! Shared helpers for the live-API integration tests.

// Each test file includes this module separately.
#![allow(dead_code)]

use mcqbench_core::{ClientConfig, HttpChatClient, Letter, Provider, Question};
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

/// Small, fast model for smoke tests.
pub const TEST_MODEL: &str = "llama-3.1-8b-instant";

/// The Groq API key, or None when unset.
pub fn get_api_key() -> Option<String> {
    env::var(Provider::Groq.api_key_env())
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Deterministic, short-timeout client configuration.
pub fn test_config() -> ClientConfig {
    ClientConfig::for_provider(Provider::Groq)
        .with_model(TEST_MODEL)
        .with_timeout(Duration::from_secs(60))
        .with_temperature(0.0)
        .with_max_tokens(512)
        .with_max_attempts(2)
        .with_retry_delay(Duration::from_millis(500))
}

pub fn create_test_client(api_key: &str) -> HttpChatClient {
    HttpChatClient::new(api_key, test_config()).expect("client should build")
}

/// A question any model should get right.
pub fn arithmetic_question() -> Question {
    Question {
        id: 1,
        text: "What is 2 + 2?".to_string(),
        options: BTreeMap::from([
            (Letter::A, "3".to_string()),
            (Letter::B, "4".to_string()),
            (Letter::C, "5".to_string()),
            (Letter::D, "22".to_string()),
        ]),
        correct_answer: Letter::B,
    }
}
