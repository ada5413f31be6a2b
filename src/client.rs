use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;

use crate::conversation::Message;
use crate::error::ChatError;

/// Issues one streamed chat-completions request per send and assembles the
/// full answer before returning. No retry, no cancellation.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
}

impl CompletionClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Sends the entire conversation as ordered turns and returns the
    /// concatenated content deltas once the stream ends. Callers enforce
    /// that all three credential fields are non-empty before this runs.
    pub async fn complete(
        &self,
        api_key: &str,
        api_base: &str,
        model: &str,
        conversation: &[Message],
    ) -> Result<String, ChatError> {
        let url = chat_completions_url(api_base);

        let body = json!({
            "model": model,
            "messages": conversation,
            "stream": true,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport(format!("{} {}", status, text.trim())));
        }

        let mut assembler = StreamAssembler::new();
        let mut stream = response.bytes_stream();

        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|e| ChatError::Transport(e.to_string()))?;
            assembler.push(&chunk);
            if assembler.is_done() {
                break;
            }
        }

        Ok(assembler.into_answer())
    }
}

impl Default for CompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize the base URL so both "https://host/v1" and
/// "https://host/v1/chat/completions" work as a setting.
fn chat_completions_url(api_base: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

/// Accumulates SSE bytes, splits them into `data:` lines, and concatenates
/// every `choices[0].delta.content` fragment in arrival order. Network
/// chunks may split lines anywhere, so partial input stays buffered.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    line_buffer: String,
    answer: String,
    done: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.line_buffer.push_str(&String::from_utf8_lossy(chunk));

        while let Some(pos) = self.line_buffer.find('\n') {
            let line = self.line_buffer[..pos].trim().to_string();
            self.line_buffer.drain(..pos + 1);
            self.push_line(&line);
        }
    }

    fn push_line(&mut self, line: &str) {
        if self.done || line.is_empty() {
            return;
        }

        if line == "data: [DONE]" {
            self.done = true;
            return;
        }

        if let Some(payload) = line.strip_prefix("data: ") {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
                if let Some(fragment) = value["choices"][0]["delta"]["content"].as_str() {
                    self.answer.push_str(fragment);
                }
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_answer(self) -> String {
        self.answer
    }
}
