use quikthread_logging::{qt_info, qt_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn generated(topic: &str) -> Self {
        Self {
            kind: ToastKind::Success,
            message: format!("\"{topic}\" generated successfully!"),
        }
    }

    pub fn generation_failed(topic: &str) -> Self {
        Self {
            kind: ToastKind::Error,
            message: format!("Failed to generate \"{topic}\""),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Sends notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => qt_info!("{}", toast.message),
            ToastKind::Error => qt_warn!("{}", toast.message),
        }
    }
}
