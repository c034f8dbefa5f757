//! Blocking HTTP client for the Groq chat-completions API
//!
//! Groq exposes an OpenAI-compatible endpoint. Timeouts are the only
//! retryable failure: retried with jittered exponential backoff up to the
//! configured budget, then surfaced as a degraded-service error rather than
//! hanging indefinitely.

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const BACKOFF_BASE_MS: u64 = 500;

/// One message in a chat-completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system",
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Groq API client
pub struct GroqClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl GroqClient {
    /// Create a client with the caller's API key and per-request timeout.
    ///
    /// The key comes from the caller's environment - this crate never reads
    /// it from global state itself.
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerateError::Failed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Override the endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Single chat-completion call
    pub fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerateError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout { attempts: 1 }
                } else {
                    GenerateError::ServiceUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(GenerateError::ServiceUnavailable(format!(
                    "{status}: {body}"
                )));
            }
            return Err(GenerateError::Failed(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerateError::Failed(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerateError::Failed("Response contained no choices".to_string()))
    }

    /// Chat with bounded retry on timeout.
    ///
    /// A timed-out call is retried up to `max_retries` times after the initial
    /// attempt, with backoff doubling per attempt plus up to 250ms of jitter.
    /// Non-timeout errors are not retried; exhausting the budget surfaces the
    /// timeout with the total attempt count.
    pub fn chat_with_retry(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
        max_retries: u32,
    ) -> Result<String, GenerateError> {
        let attempts = max_retries + 1;

        for attempt in 0..attempts {
            match self.chat(model, &messages, temperature, max_tokens) {
                Ok(text) => return Ok(text),
                Err(GenerateError::Timeout { .. }) if attempt + 1 < attempts => {
                    let backoff = BACKOFF_BASE_MS * 2u64.pow(attempt) + fastrand::u64(0..250);
                    std::thread::sleep(Duration::from_millis(backoff));
                }
                Err(GenerateError::Timeout { .. }) => {
                    return Err(GenerateError::Timeout { attempts });
                }
                Err(other) => return Err(other),
            }
        }

        unreachable!("retry loop always returns")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Accepts connections, counts them, and never answers
    fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                // Hold the socket open so the client times out instead of
                // seeing a closed connection
                held.push(stream);
            }
        });
        (format!("http://{addr}"), hits)
    }

    /// Drains the request, counts it, and answers with the given status line
    fn erroring_server(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream.set_read_timeout(Some(Duration::from_millis(150)));
                let mut buf = [0u8; 2048];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                let _ = stream.write_all(
                    format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                        .as_bytes(),
                );
            }
        });
        (format!("http://{addr}"), hits)
    }

    #[test]
    fn test_timeout_retries_then_surfaces_timeout_with_attempt_count() {
        let (url, hits) = silent_server();
        let client = GroqClient::new("key".to_string(), Duration::from_millis(200))
            .unwrap()
            .with_base_url(url);

        let err = client
            .chat_with_retry("model", vec![ChatMessage::user("hi")], 0.0, 16, 1)
            .unwrap_err();

        // max_retries = 1 means one retry after the initial attempt
        assert!(matches!(err, GenerateError::Timeout { attempts: 2 }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_non_timeout_error_is_not_retried() {
        let (url, hits) = erroring_server("HTTP/1.1 500 Internal Server Error");
        let client = GroqClient::new("key".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(url);

        let err = client
            .chat_with_retry("model", vec![ChatMessage::user("hi")], 0.0, 16, 3)
            .unwrap_err();

        assert!(matches!(err, GenerateError::ServiceUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let client = GroqClient::new("key".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9999/".to_string());
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile",
            messages: &messages,
            temperature: 0.3,
            max_tokens: 1024,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"use .get()"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "use .get()");
    }

    #[test]
    fn test_unreachable_endpoint_is_service_unavailable() {
        // Nothing listens on this port; the connection error must map to
        // ServiceUnavailable, not a panic or a hang
        let client = GroqClient::new("key".to_string(), Duration::from_millis(200))
            .unwrap()
            .with_base_url("http://127.0.0.1:1".to_string());

        let err = client
            .chat("model", &[ChatMessage::user("hi")], 0.0, 16)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ServiceUnavailable(_) | GenerateError::Timeout { .. }
        ));
    }
}
