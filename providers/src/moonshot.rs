//! Moonshot (Kimi) adapter. The Moonshot Chat Completions API is
//! OpenAI-compatible, so this is a thin constructor over
//! [`crate::openai_compat::OpenAiCompatProvider`] with Moonshot's default
//! base URL.

use crate::openai_compat::OpenAiCompatProvider;

pub const MOONSHOT_BASE_URL: &str = "https://api.moonshot.cn/v1";

pub fn moonshot_provider(api_key: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("moonshot", MOONSHOT_BASE_URL, api_key)
}
