pub mod dispatch;

/// Supported API operation, derived from the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ChatCompletions,
    Completions,
    Embeddings,
    Models,
    Unsupported,
}

impl Route {
    /// Classify `path` by substring. `/chat/completions` is tested before
    /// `/completions` because the latter is contained in the former.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path.contains("/chat/completions") {
            Route::ChatCompletions
        } else if path.contains("/completions") {
            Route::Completions
        } else if path.contains("/embeddings") {
            Route::Embeddings
        } else if path.contains("/models") {
            Route::Models
        } else {
            Route::Unsupported
        }
    }

    /// Path on the upstream for routes that are forwarded.
    #[must_use]
    pub fn upstream_path(self) -> Option<&'static str> {
        match self {
            Route::ChatCompletions => Some("/v1/chat/completions"),
            Route::Completions => Some("/v1/completions"),
            Route::Embeddings => Some("/v1/embeddings"),
            Route::Models | Route::Unsupported => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Route::ChatCompletions => "chat_completions",
            Route::Completions => "completions",
            Route::Embeddings => "embeddings",
            Route::Models => "models",
            Route::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completions_wins_over_completions() {
        assert_eq!(Route::from_path("/v1/chat/completions"), Route::ChatCompletions);
        assert_eq!(Route::from_path("/v1/completions"), Route::Completions);
    }

    #[test]
    fn substring_match_tolerates_prefixes() {
        assert_eq!(
            Route::from_path("/proxy/v1/embeddings"),
            Route::Embeddings
        );
        assert_eq!(Route::from_path("/v1/models"), Route::Models);
        assert_eq!(Route::from_path("/v1/models/grok-1"), Route::Models);
    }

    #[test]
    fn unknown_paths_are_unsupported() {
        assert_eq!(Route::from_path("/v1/images/generations"), Route::Unsupported);
        assert_eq!(Route::Unsupported.upstream_path(), None);
        assert_eq!(Route::Models.upstream_path(), None);
    }

    #[test]
    fn upstream_paths() {
        assert_eq!(
            Route::ChatCompletions.upstream_path(),
            Some("/v1/chat/completions")
        );
        assert_eq!(Route::Completions.upstream_path(), Some("/v1/completions"));
        assert_eq!(Route::Embeddings.upstream_path(), Some("/v1/embeddings"));
    }
}
