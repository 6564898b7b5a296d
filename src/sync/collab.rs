use tracing::{info, warn};

use crate::book::Book;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Operation went through.
    Success,
    /// Operation failed and was undone.
    Danger,
}

/// Non-blocking toast sink owned by the presentation layer.
pub trait Notifier: Send + Sync {
    /// Shows `message`.
    fn notify(&self, message: &str, kind: NoticeKind);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Success => info!(notice = message, "notify"),
            NoticeKind::Danger => warn!(notice = message, "notify"),
        }
    }
}

/// Synchronous yes/no prompt shown before a destructive action.
pub trait ConfirmGate: Send + Sync {
    /// Returns true when the user accepts `prompt` for `book`.
    fn confirm(&self, prompt: &str, book: &Book) -> bool;
}

impl<F> ConfirmGate for F
where
    F: Fn(&str, &Book) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str, book: &Book) -> bool {
        self(prompt, book)
    }
}

/// Gate with a fixed answer, for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmGate for AutoConfirm {
    fn confirm(&self, _prompt: &str, _book: &Book) -> bool {
        self.0
    }
}
