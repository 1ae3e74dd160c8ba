//! Static per-provider data: wire dialect, public base URL, and model lists.
//!
//! ```rust
//! use fprovider::{ProviderId, WireFormat, catalog};
//!
//! let profile = catalog::profile(ProviderId::OpenRouter);
//! assert_eq!(profile.wire, WireFormat::ChatCompletions);
//! assert!(profile.models.contains(&profile.default_model));
//! ```

use crate::{ProviderId, WireFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    pub id: ProviderId,
    pub display_name: &'static str,
    pub wire: WireFormat,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub models: &'static [&'static str],
}

const ANTHROPIC: ProviderProfile = ProviderProfile {
    id: ProviderId::Anthropic,
    display_name: "Anthropic",
    wire: WireFormat::Messages,
    base_url: "https://api.anthropic.com",
    default_model: "claude-sonnet-4-5",
    models: &["claude-sonnet-4-5", "claude-opus-4-1", "claude-haiku-4-5"],
};

const OPENAI: ProviderProfile = ProviderProfile {
    id: ProviderId::OpenAi,
    display_name: "OpenAI",
    wire: WireFormat::ChatCompletions,
    base_url: "https://api.openai.com",
    default_model: "gpt-4o-mini",
    models: &["gpt-4o-mini", "gpt-4o", "gpt-4.1", "gpt-4.1-mini"],
};

const OPENROUTER: ProviderProfile = ProviderProfile {
    id: ProviderId::OpenRouter,
    display_name: "OpenRouter",
    wire: WireFormat::ChatCompletions,
    base_url: "https://openrouter.ai/api",
    default_model: "anthropic/claude-sonnet-4.5",
    models: &[
        "anthropic/claude-sonnet-4.5",
        "openai/gpt-4o-mini",
        "google/gemini-2.5-flash",
    ],
};

pub fn profile(id: ProviderId) -> &'static ProviderProfile {
    match id {
        ProviderId::Anthropic => &ANTHROPIC,
        ProviderId::OpenAi => &OPENAI,
        ProviderId::OpenRouter => &OPENROUTER,
    }
}

pub fn profiles() -> impl Iterator<Item = &'static ProviderProfile> {
    ProviderId::ALL.into_iter().map(profile)
}

/// A non-blank custom endpoint wins over the public base URL. Trailing slashes are trimmed.
pub fn resolve_endpoint(id: ProviderId, custom_endpoint: Option<&str>) -> String {
    let endpoint = custom_endpoint
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(profile(id).base_url);

    endpoint.trim_end_matches('/').to_string()
}
