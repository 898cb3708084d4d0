//! Timed text submission.
//!
//! Some consumers (a phone keyboard, a paste box) deliver a whole line at
//! once. Interactive CLIs that treat a fast burst as a paste would swallow
//! the trailing Enter, so the text is typed one character at a time with a
//! short gap, followed by a longer pause and a carriage return.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Gap after each character.
pub const CHAR_DELAY: Duration = Duration::from_millis(5);

/// Pause between the last character and the submit key.
pub const SUBMIT_DELAY: Duration = Duration::from_millis(30);

/// Bytes written to submit the line.
pub const SUBMIT_KEY: &[u8] = b"\r";

/// Source of delays. Swapped for an instant clock in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time via `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Anything the injector can type into.
#[async_trait]
pub trait InputTarget: Send + Sync {
    async fn write_input(&self, bytes: &[u8]);
}

#[derive(Clone)]
pub struct TextInjector {
    clock: Arc<dyn Clock>,
    char_delay: Duration,
    submit_delay: Duration,
}

impl TextInjector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            char_delay: CHAR_DELAY,
            submit_delay: SUBMIT_DELAY,
        }
    }

    pub fn with_delays(mut self, char_delay: Duration, submit_delay: Duration) -> Self {
        self.char_delay = char_delay;
        self.submit_delay = submit_delay;
        self
    }

    /// Type `text` into `target` and press Enter.
    ///
    /// Each write carries exactly one complete Unicode scalar value, so a
    /// multi-byte character is never split across writes. Empty text
    /// produces only the submit key.
    pub async fn inject<T>(&self, target: &T, text: &str)
    where
        T: InputTarget + ?Sized,
    {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let encoded = ch.encode_utf8(&mut buf);
            target.write_input(encoded.as_bytes()).await;
            self.clock.sleep(self.char_delay).await;
        }
        self.clock.sleep(self.submit_delay).await;
        target.write_input(SUBMIT_KEY).await;
    }
}

impl std::fmt::Debug for TextInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextInjector")
            .field("char_delay", &self.char_delay)
            .field("submit_delay", &self.submit_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Step {
        Write(Vec<u8>),
        Sleep(Duration),
    }

    /// Shared journal recording writes and sleeps in the order they happen.
    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<Step>>>);

    impl Journal {
        fn steps(&self) -> Vec<Step> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for Journal {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(Step::Sleep(duration));
        }
    }

    #[async_trait]
    impl InputTarget for Journal {
        async fn write_input(&self, bytes: &[u8]) {
            self.0.lock().unwrap().push(Step::Write(bytes.to_vec()));
        }
    }

    fn injector(journal: &Journal) -> TextInjector {
        TextInjector::new(Arc::new(journal.clone()))
    }

    #[tokio::test]
    async fn types_each_char_then_submits() {
        let journal = Journal::default();
        injector(&journal).inject(&journal, "ab").await;

        assert_eq!(
            journal.steps(),
            vec![
                Step::Write(b"a".to_vec()),
                Step::Sleep(CHAR_DELAY),
                Step::Write(b"b".to_vec()),
                Step::Sleep(CHAR_DELAY),
                Step::Sleep(SUBMIT_DELAY),
                Step::Write(b"\r".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_text_only_submits() {
        let journal = Journal::default();
        injector(&journal).inject(&journal, "").await;

        assert_eq!(
            journal.steps(),
            vec![Step::Sleep(SUBMIT_DELAY), Step::Write(b"\r".to_vec())]
        );
    }

    #[tokio::test]
    async fn multibyte_chars_are_never_split() {
        let journal = Journal::default();
        injector(&journal).inject(&journal, "é😀").await;

        let writes: Vec<Vec<u8>> = journal
            .steps()
            .into_iter()
            .filter_map(|step| match step {
                Step::Write(bytes) => Some(bytes),
                Step::Sleep(_) => None,
            })
            .collect();
        assert_eq!(
            writes,
            vec![
                "é".as_bytes().to_vec(),
                "😀".as_bytes().to_vec(),
                b"\r".to_vec()
            ]
        );
    }

    #[tokio::test]
    async fn custom_delays_are_used() {
        let journal = Journal::default();
        injector(&journal)
            .with_delays(Duration::ZERO, Duration::from_millis(1))
            .inject(&journal, "x")
            .await;

        assert_eq!(
            journal.steps(),
            vec![
                Step::Write(b"x".to_vec()),
                Step::Sleep(Duration::ZERO),
                Step::Sleep(Duration::from_millis(1)),
                Step::Write(b"\r".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn tokio_clock_honours_duration() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
