//! Prompt templates for the answering and verification passes.

use crate::question::{Letter, Question};
use std::fmt::Write;

fn write_question(out: &mut String, question: &Question) {
    let _ = writeln!(out, "Question: {}", question.text);
    out.push('\n');
    out.push_str("Options:\n");
    for letter in Letter::ALL {
        let _ = writeln!(out, "{}: {}", letter, question.option(letter));
    }
}

/// Prompt asking the model to solve a question and end with `ANSWER: X`.
pub fn answer_prompt(question: &Question) -> String {
    let mut out = String::from(
        "Please solve this multiple choice question. \
         Provide your complete reasoning and then state your final answer.\n\n",
    );
    write_question(&mut out, question);
    out.push_str("\nPlease provide your answer in the format 'ANSWER: X' where X is A, B, C, or D.");
    out
}

/// Prompt asking a verifier to confirm or revise an earlier answer.
///
/// `original_response` is the full text of the first pass; it may be empty
/// when only the letter is known.
pub fn verification_prompt(
    question: &Question,
    original_response: &str,
    original_answer: Letter,
) -> String {
    let mut out = String::from(
        "Please verify this answer to a multiple choice question. You are the verifier.\n\n",
    );
    write_question(&mut out, question);
    if !original_response.trim().is_empty() {
        let _ = write!(out, "\nOriginal response:\n{}\n", original_response.trim());
    }
    let _ = write!(
        out,
        "\nOriginal answer extracted: {}\n\n\
         As a verifier, please:\n\
         1. Review the reasoning\n\
         2. Check if the answer is correct\n\
         3. If you disagree, provide your reasoning\n\
         4. Provide your final answer\n\n\
         End your response with either:\n\
         VERIFIED: X\n\
         or\n\
         CHANGED: X\n\
         where X is A, B, C, or D. Use VERIFIED if you agree with the original answer \
         and CHANGED if you do not.",
        original_answer
    );
    out
}
