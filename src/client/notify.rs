//! Transient user-facing notifications.
//!
//! Stores never let a remote failure escape as a panic; they post a notice on
//! this channel and keep their last known-good snapshot. The UI layer drains
//! the receiver and renders notices as dismissible toasts. A missing receiver
//! is fine: posting to a closed channel is a no-op.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn info(&self, text: impl Into<String>) {
        self.post(NoticeLevel::Info, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.post(NoticeLevel::Error, text.into());
    }

    fn post(&self, level: NoticeLevel, text: String) {
        log::debug!("notice ({:?}): {}", level, text);
        let _ = self.sender.send(Notice { level, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notices_arrive_in_post_order() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.error("Failed to load events");
        notifier.info("Reconnected");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, NoticeLevel::Error);
        assert_eq!(first.text, "Failed to load events");
        assert_eq!(rx.recv().await.unwrap().level, NoticeLevel::Info);
    }

    #[test]
    fn posting_after_receiver_drop_is_a_no_op() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.error("nobody listening");
    }
}
