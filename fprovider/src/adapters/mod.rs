//! Wire dialects. Each module builds the HTTP request and decodes stream payloads.

pub mod anthropic;
pub mod openai;
