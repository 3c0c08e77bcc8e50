use quikthread_engine::{LogNotifier, Notifier, Toast, ToastKind};

/// Shows toasts on stderr and records them in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: Toast) {
        let label = match toast.kind {
            ToastKind::Success => "done",
            ToastKind::Error => "error",
        };
        eprintln!("[{label}] {}", toast.message);
        LogNotifier.notify(toast);
    }
}
