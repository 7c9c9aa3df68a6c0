//! User-facing notifications ("toasts").
//!
//! Notifications are fire-and-forget: the coordinator hands them to a
//! [`Notifier`] and never waits for acknowledgement.

use std::sync::Mutex;

use colored::Colorize;
use serde::Serialize;

use crate::error::AppError;

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Success,
    Error,
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: "Success".into(),
            message: message.into(),
            variant: ToastVariant::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".into(),
            message: message.into(),
            variant: ToastVariant::Error,
        }
    }

    /// Error toast built from the error's sanitized presentation.
    pub fn from_error(err: &AppError) -> Self {
        let presentation = err.to_presentation();
        Self {
            title: presentation.title,
            message: presentation.message,
            variant: ToastVariant::Error,
        }
    }
}

/// Sink for toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Prints toasts to the terminal.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Success => {
                println!("{} {}", format!("✔ {}:", toast.title).green().bold(), toast.message)
            }
            ToastVariant::Error => {
                eprintln!("{} {}", format!("✖ {}:", toast.title).red().bold(), toast.message)
            }
        }
    }
}

/// Keeps every toast in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<Toast> {
        self.toasts()
            .into_iter()
            .filter(|t| t.variant == ToastVariant::Error)
            .collect()
    }

    pub fn successes(&self) -> Vec<Toast> {
        self.toasts()
            .into_iter()
            .filter(|t| t.variant == ToastVariant::Success)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_toast_uses_presentation() {
        let toast = Toast::from_error(&AppError::SubmissionFailed(Some("DUPLICATE".into())));

        assert_eq!(toast.variant, ToastVariant::Error);
        assert_eq!(toast.message, "DUPLICATE");
    }

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Toast::error("first"));
        notifier.notify(Toast::success("second"));

        let toasts = notifier.toasts();
        assert_eq!(toasts[0].message, "first");
        assert_eq!(toasts[1].message, "second");
        assert_eq!(notifier.errors().len(), 1);
        assert_eq!(notifier.successes().len(), 1);
    }

    #[test]
    fn toast_serializes_lowercase_variant() {
        let json = serde_json::to_value(Toast::success("ok")).unwrap();
        assert_eq!(json["variant"], "success");
    }
}
