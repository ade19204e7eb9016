//! Terminal key reader
//!
//! Runs on a blocking thread and forwards key presses to the event loop.
//! It must be stopped before another program takes over the terminal,
//! otherwise the two race for keystrokes.

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::actions::Action;

/// How long one poll may block before the stop flag is checked again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct InputReader {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl InputReader {
    pub fn spawn(tx: UnboundedSender<Action>) -> Self {
        Self::spawn_with(tx, poll_terminal)
    }

    /// Spawn with a custom key source; `next` may block up to a poll interval
    fn spawn_with<F>(tx: UnboundedSender<Action>, mut next: F) -> Self
    where
        F: FnMut() -> Option<KeyEvent> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = tokio::task::spawn_blocking(move || {
            while !flag.load(Ordering::Acquire) {
                if let Some(key) = next() {
                    if tx.send(Action::KeyPress(key)).is_err() {
                        break;
                    }
                }
                if tx.is_closed() {
                    break;
                }
            }
            tracing::debug!("input reader stopped");
        });
        Self { stop, handle }
    }

    /// Stop reading and wait until the reader thread no longer touches the terminal
    pub async fn stop(self) {
        self.stop.store(true, Ordering::Release);
        if let Err(e) = self.handle.await {
            tracing::warn!("input reader panicked: {}", e);
        }
    }
}

fn poll_terminal() -> Option<KeyEvent> {
    if !event::poll(POLL_INTERVAL).unwrap_or(false) {
        return None;
    }
    match event::read() {
        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use tokio::sync::mpsc;

    fn idle() -> Option<KeyEvent> {
        std::thread::sleep(Duration::from_millis(5));
        None
    }

    #[tokio::test]
    async fn test_forwards_keys() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sent = false;
        let reader = InputReader::spawn_with(tx, move || {
            if sent {
                return idle();
            }
            sent = true;
            Some(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE))
        });

        match rx.recv().await {
            Some(Action::KeyPress(key)) => assert_eq!(key.code, KeyCode::Char('a')),
            other => panic!("expected a key press, got {:?}", other),
        }
        reader.stop().await;
    }

    #[tokio::test]
    async fn test_stop_joins_while_receiver_alive() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let reader = InputReader::spawn_with(tx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            idle()
        });

        tokio::time::timeout(Duration::from_secs(2), reader.stop())
            .await
            .expect("reader did not stop");

        // Nothing reads the terminal once stop has returned
        let after_stop = reads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(reads.load(Ordering::SeqCst), after_stop);
    }
}
