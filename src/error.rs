use serde::Serialize;
use thiserror::Error;

/// Patterns (lowercase) that indicate sensitive data not safe for UI display.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &[
    "bearer ",
    "refresh_token",
    "access_token",
    "client_secret",
    "authorization:",
];

/// Shown when a rejected submission carries no readable message.
pub const SUBMISSION_FALLBACK_MESSAGE: &str = "Failed to upload the tanks.";

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message for UI display.
/// If sensitive content is detected, returns the fallback instead.
fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) || msg.trim().is_empty() {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// User-friendly error presentation for the notification layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Pipeline ──────────────────────────────────────────────────────────────
    #[error("tokenizer unavailable")]
    TokenizerUnavailable,

    #[error("not ready")]
    NotReady,

    #[error("Category lookup failed: {0}")]
    CategoryLookupFailed(String),

    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    /// The input file could not be opened or read.
    #[error("Cannot read {path}: {reason}")]
    FileUnreadable { path: String, reason: String },

    /// Remote batch creation was rejected. Carries the server's message when
    /// one could be extracted from the error payload.
    #[error("Submission failed: {}", .0.as_deref().unwrap_or(SUBMISSION_FALLBACK_MESSAGE))]
    SubmissionFailed(Option<String>),

    // ── Salesforce ────────────────────────────────────────────────────────────
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired")]
    SessionExpired,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── Setup ─────────────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts the error into a presentation suitable for a toast.
    /// Never leaks secrets, tokens, or sensitive URL parameters.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            AppError::TokenizerUnavailable => ErrorPresentation {
                title: "Tokenizer Unavailable".into(),
                message: "The CSV tokenizer could not be loaded.".into(),
                action: Some("Restart the application".into()),
            },

            AppError::NotReady => ErrorPresentation {
                title: "Not Ready".into(),
                message: "The CSV tokenizer is not ready or no file was selected.".into(),
                action: Some("Wait for startup and choose a file".into()),
            },

            AppError::CategoryLookupFailed(_) => ErrorPresentation {
                title: "Tank Types Unavailable".into(),
                message: "Failed to load the tank types.".into(),
                action: Some("Retry loading tank types".into()),
            },

            AppError::CsvInvalid(_) => ErrorPresentation {
                title: "Invalid CSV".into(),
                message: "The CSV file could not be processed.".into(),
                action: Some("Fix the CSV file and choose it again".into()),
            },

            AppError::FileUnreadable { path, reason } => ErrorPresentation {
                title: "File Not Readable".into(),
                message: sanitize_message(
                    &format!("Could not read {}: {}", path, reason),
                    "The selected file could not be read.",
                ),
                action: Some("Check the file path and permissions".into()),
            },

            AppError::SubmissionFailed(msg) => ErrorPresentation {
                title: "Upload Failed".into(),
                message: match msg {
                    Some(m) => sanitize_message(m, SUBMISSION_FALLBACK_MESSAGE),
                    None => SUBMISSION_FALLBACK_MESSAGE.into(),
                },
                action: None,
            },

            AppError::NotAuthenticated => ErrorPresentation {
                title: "Not Logged In".into(),
                message: "No Salesforce instance URL or access token is configured.".into(),
                action: Some("Provide --instance-url and --access-token".into()),
            },

            AppError::SessionExpired => ErrorPresentation {
                title: "Session Expired".into(),
                message: "Your Salesforce session has expired.".into(),
                action: Some("Log in again and refresh the access token".into()),
            },

            AppError::ConnectionFailed(_) => ErrorPresentation {
                title: "Connection Failed".into(),
                message: "Could not connect to Salesforce. Please check your internet connection."
                    .into(),
                action: Some("Check network and retry".into()),
            },

            AppError::Config(msg) => ErrorPresentation {
                title: "Configuration Error".into(),
                message: sanitize_message(msg, "The configuration is invalid."),
                action: Some("Check the config file and command-line flags".into()),
            },

            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_presentation().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<AppError> {
        vec![
            AppError::TokenizerUnavailable,
            AppError::NotReady,
            AppError::CategoryLookupFailed("timeout".into()),
            AppError::CsvInvalid("invalid utf-8".into()),
            AppError::FileUnreadable {
                path: "tanques.csv".into(),
                reason: "No such file or directory".into(),
            },
            AppError::SubmissionFailed(Some("DUPLICATE".into())),
            AppError::SubmissionFailed(None),
            AppError::NotAuthenticated,
            AppError::SessionExpired,
            AppError::ConnectionFailed("timeout".into()),
            AppError::Config("missing instance_url".into()),
            AppError::Internal("something broke".into()),
        ]
    }

    #[test]
    fn all_variants_have_nonempty_title_and_message() {
        for variant in all_variants() {
            let presentation = variant.to_presentation();
            assert!(!presentation.title.trim().is_empty(), "Empty title for {:?}", variant);
            assert!(!presentation.message.trim().is_empty(), "Empty message for {:?}", variant);
        }
    }

    #[test]
    fn tokenizer_failure_displays_fixed_text() {
        assert_eq!(AppError::TokenizerUnavailable.to_string(), "tokenizer unavailable");
        assert_eq!(AppError::NotReady.to_string(), "not ready");
    }

    #[test]
    fn submission_message_is_passed_through() {
        let presentation = AppError::SubmissionFailed(Some("DUPLICATE".into())).to_presentation();
        assert_eq!(presentation.message, "DUPLICATE");
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let presentation = AppError::FileUnreadable {
            path: "/data/tanques.csv".into(),
            reason: "No such file or directory (os error 2)".into(),
        }
        .to_presentation();

        assert!(presentation.message.contains("/data/tanques.csv"), "{}", presentation.message);
        assert!(presentation.message.contains("No such file"));
    }

    #[test]
    fn submission_without_message_uses_fallback() {
        let presentation = AppError::SubmissionFailed(None).to_presentation();
        assert_eq!(presentation.message, SUBMISSION_FALLBACK_MESSAGE);

        let blank = AppError::SubmissionFailed(Some("   ".into())).to_presentation();
        assert_eq!(blank.message, SUBMISSION_FALLBACK_MESSAGE);
    }

    #[test]
    fn serialization_produces_presentation_fields() {
        for variant in all_variants() {
            let json = serde_json::to_value(&variant).unwrap();
            assert!(json.get("title").is_some(), "{:?} missing title", variant);
            assert!(json.get("message").is_some(), "{:?} missing message", variant);
            assert!(json.get("action").is_some(), "{:?} missing action", variant);
        }
    }

    #[test]
    fn no_secret_leakage_in_presentation() {
        let test_cases: Vec<(&str, AppError)> = vec![
            ("SubmissionFailed", AppError::SubmissionFailed(Some("Bearer abc123 rejected".into()))),
            ("Config", AppError::Config("access_token=xyz is malformed".into())),
            ("ConnectionFailed", AppError::ConnectionFailed("client_secret=abc".into())),
            ("Internal", AppError::Internal("refresh_token leaked".into())),
        ];

        for (label, variant) in test_cases {
            let presentation = variant.to_presentation();
            let output_lower = format!(
                "{} {} {}",
                presentation.title,
                presentation.message,
                presentation.action.as_deref().unwrap_or("")
            )
            .to_ascii_lowercase();

            for pattern in SENSITIVE_PATTERNS {
                assert!(
                    !output_lower.contains(pattern),
                    "{} presentation contains sensitive pattern",
                    label
                );
            }
        }
    }
}
