//! Project-wide constants.

/// Literal token in the prompt template that each task payload replaces.
pub const TASK_MARKER: &str = "{{ .task }}";

/// Default cap on simultaneous in-flight requests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Default model when the prompt template does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default base URL for the OpenAI-compatible chat completions API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
