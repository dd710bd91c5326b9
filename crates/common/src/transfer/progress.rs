use tokio::sync::mpsc;

/// Scoped progress sink for a transfer: a sequence of byte counts,
/// closed when the last clone drops. [`Progress::none`] reports nowhere.
#[derive(Debug, Clone, Default)]
pub struct Progress(Option<mpsc::UnboundedSender<u64>>);

impl Progress {
    pub fn none() -> Self {
        Self(None)
    }

    /// A sink and the receiver a renderer can consume counts from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(Some(tx)), rx)
    }

    pub(crate) fn advance(&self, bytes: u64) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_arrive_and_channel_closes() {
        let (progress, mut rx) = Progress::channel();
        progress.advance(10);
        progress.advance(20);
        drop(progress);

        assert_eq!(rx.recv().await, Some(10));
        assert_eq!(rx.recv().await, Some(20));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_none_sink_is_silent() {
        Progress::none().advance(42);
    }
}
