use crate::stream::Delta;

/// Why a stream session ended. Passed to [`StreamListener::on_stop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Terminal token received, or the body ended after a `Done` delta.
    Completed,
    /// The body ended without a `Done` delta or terminal token.
    Truncated,
    /// Request, HTTP status or transport failure.
    Failed,
    Cancelled,
    TimedOut,
}

impl StopReason {
    /// Only a stream that reached its finish marker counts as a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Receives the lifecycle of one stream session.
///
/// `on_start` fires once before the request is sent, `on_message` once per
/// delta in arrival order, `on_stop` exactly once after the last delta.
pub trait StreamListener: Send {
    fn on_start(&mut self) {}
    fn on_message(&mut self, delta: Delta);
    fn on_stop(&mut self, _reason: StopReason) {}
}

/// Listener that concatenates streamed content.
#[derive(Debug, Default)]
pub struct TextCollector {
    text: String,
    stop: Option<StopReason>,
}

impl TextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }
}

impl StreamListener for TextCollector {
    fn on_message(&mut self, delta: Delta) {
        self.text.push_str(&delta.content);
    }

    fn on_stop(&mut self, reason: StopReason) {
        self.stop = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_stream_is_not_a_success() {
        assert!(StopReason::Completed.is_success());
        assert!(!StopReason::Truncated.is_success());
        assert!(!StopReason::Failed.is_success());
    }

    #[test]
    fn collector_keeps_text_and_stop_reason() {
        let mut collector = TextCollector::new();
        collector.on_message(Delta::streaming("Hel"));
        collector.on_message(Delta::done("lo"));
        collector.on_stop(StopReason::Completed);
        assert_eq!(collector.text(), "Hello");
        assert_eq!(collector.stop_reason(), Some(StopReason::Completed));
    }
}
