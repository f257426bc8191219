//! Optional text-generation collaborator.
//!
//! Talks to the Gemini REST API when `GEMINI_API_KEY` is set; every
//! failure mode is non-fatal to callers, which fall back to a disabled
//! state. The round trip is blocking with a client-side timeout.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};

use vvault::utils::errors::AiError;

const API_KEY_VAR: &str = "GEMINI_API_KEY";
const ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Extensions sampled when building a manifest prompt.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "py", "js", "html", "css", "rs", "toml"];
const SAMPLE_CHARS: usize = 2000;
const PROMPT_CAP: usize = 10_000;

const PASSWORD_PROMPT: &str = "Generate a single, secure, 16-character password with uppercase, \
     lowercase, numbers, and symbols. Provide only the password text and nothing else.";

/// Asks the service for a fresh 16-character password.
pub fn generate_password() -> Result<String, AiError> {
    generate(PASSWORD_PROMPT)
}

/// Summarizes the text-like inputs into a one-sentence manifest.
///
/// Samples up to 2000 characters per file and caps the combined prompt;
/// inputs with no text-like files short-circuit without a service call.
pub fn summarize(files: &[PathBuf]) -> Result<String, AiError> {
    let mut samples = String::new();
    for path in files {
        let text_like = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if !text_like {
            continue;
        }

        let Ok(content) = fs::read_to_string(path) else {
            debug!("skipping unreadable input {}", path.display());
            continue;
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        samples.push_str(&format!("--- Content from {name} ---\n"));
        samples.extend(content.chars().take(SAMPLE_CHARS));
        samples.push_str("\n\n");
    }

    if samples.is_empty() {
        return Ok("No text-based files found to summarize.".to_owned());
    }

    if samples.len() > PROMPT_CAP {
        let mut cut = PROMPT_CAP;
        while !samples.is_char_boundary(cut) {
            cut -= 1;
        }
        samples.truncate(cut);
    }

    let prompt = format!(
        "Summarize the following file content into a concise, one-sentence \"manifest\". \
         Example: 'Contains Python scripts and project notes.'\n\nHere is the content:\n{samples}"
    );
    generate(&prompt).map(|reply| reply.replace('\n', " "))
}

fn generate(prompt: &str) -> Result<String, AiError> {
    let key = env::var(API_KEY_VAR).map_err(|_| AiError::NotConfigured)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| AiError::ServiceUnavailable(err.to_string()))?;

    let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
    let response = client
        .post(ENDPOINT)
        .query(&[("key", key.as_str())])
        .json(&body)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|err| AiError::ServiceUnavailable(err.without_url().to_string()))?;

    let reply: Value = response
        .json()
        .map_err(|err| AiError::ServiceUnavailable(err.to_string()))?;

    reply["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|text| text.trim().to_owned())
        .ok_or_else(|| AiError::ServiceUnavailable("response carried no candidate text".to_owned()))
}
