use std::time::{Duration, Instant};

pub const DEFAULT_PREVIEW_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds the latest edited input until it has been quiet for the debounce window.
#[derive(Debug, Clone)]
pub struct PreviewDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for PreviewDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_DEBOUNCE)
    }
}

impl PreviewDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Records an edit; any earlier pending input is superseded.
    pub fn schedule(&mut self, input: impl Into<String>, now: Instant) {
        self.pending = Some((input.into(), now + self.delay));
    }

    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(input, _)| input),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_input_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = PreviewDebouncer::new(Duration::from_millis(300));
        debouncer.schedule("1", start);
        debouncer.schedule("12", start + Duration::from_millis(100));

        assert_eq!(debouncer.take_due(start + Duration::from_millis(350)), None);
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(400)),
            Some("12".to_string())
        );
        assert_eq!(debouncer.take_due(start + Duration::from_secs(1)), None);
    }
}
