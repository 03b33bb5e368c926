//! Integration tests for HttpChatClient against the real Groq API
//!
//! These tests require a valid GROQ_API_KEY environment variable.
//! They are skipped if the API key is not set.

mod common;

use common::{arithmetic_question, create_test_client, get_api_key, test_config};
use mcqbench_core::{AnsweringClient, ChatModel, HttpChatClient, LlmError};

#[tokio::test]
#[ignore] // Requires GROQ_API_KEY
async fn test_complete_simple_prompt() {
    let Some(api_key) = get_api_key() else {
        eprintln!("Skipping test: GROQ_API_KEY not set");
        return;
    };

    let client = create_test_client(&api_key);
    let text = client
        .complete("What is 2 + 2? Reply with just the number.")
        .await
        .unwrap_or_else(|e| panic!("Complete failed: {:?}", e));

    println!("Response: {}", text);
    assert!(text.contains('4'), "Response should contain '4', got: {}", text);
}

#[tokio::test]
#[ignore] // Requires GROQ_API_KEY
async fn test_ask_and_verify() {
    let Some(api_key) = get_api_key() else {
        eprintln!("Skipping test: GROQ_API_KEY not set");
        return;
    };

    let config = test_config();
    let client = AnsweringClient::new(create_test_client(&api_key), &config);
    let question = arithmetic_question();

    let answer = client
        .ask(&question, |n| eprintln!("retrying after: {}", n.error))
        .await
        .unwrap_or_else(|e| panic!("Ask failed: {:?}", e));
    println!("Answered {} in {} attempt(s)", answer.letter, answer.attempts);
    assert!(question.is_correct(answer.letter));

    let verification = client
        .verify(&question, &answer, |_| {})
        .await
        .unwrap_or_else(|e| panic!("Verify failed: {:?}", e));
    println!("Verdict: {:?}", verification.verdict);
    assert!(question.is_correct(verification.letter()));
}

#[tokio::test]
#[ignore] // Requires network
async fn test_bad_key_is_api_error() {
    let client = HttpChatClient::new("not-a-real-key", test_config()).unwrap();

    let err = client.complete("Hello").await.unwrap_err();
    match err {
        LlmError::Api { status, .. } => assert_eq!(status, 401),
        other => panic!("Expected Api error, got {:?}", other),
    }
}
