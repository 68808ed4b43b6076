//! Minimal incremental SSE frame parser shared by every adapter: both the
//! OpenAI-compatible Chat Completions stream and the Anthropic Messages
//! stream are `data: <json>\n\n` framed.

pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self { buffer: String::new() }
    }

    /// Feed a chunk of bytes, returning any complete `data:` payloads it
    /// completed. A payload of exactly `[DONE]` is returned verbatim so
    /// callers can recognize the OpenAI stream terminator.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut payloads = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..boundary + 2).collect();
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    payloads.push(data.trim().to_string());
                }
            }
        }
        payloads
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}
