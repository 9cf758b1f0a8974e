use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::event::{AppEvent, EventSender};

/// Drives the typing reveal for at most one message at a time. The
/// ticking happens on a spawned interval task that reports back through
/// the event channel; the handle stays here so a conversation switch,
/// logout, or shutdown can cancel it deterministically.
#[derive(Debug, Default)]
pub struct RevealAnimator {
    current: Option<RevealTask>,
}

#[derive(Debug)]
struct RevealTask {
    message: Uuid,
    handle: JoinHandle<()>,
}

impl Drop for RevealTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl RevealAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking for `message`, replacing any running reveal.
    pub fn start(&mut self, message: Uuid, period: Duration, events: EventSender) {
        self.cancel();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !events.send(AppEvent::RevealTick(message)) {
                    break;
                }
            }
        });
        self.current = Some(RevealTask { message, handle });
    }

    /// Aborts the running reveal, if any.
    pub fn cancel(&mut self) {
        self.current = None;
    }

    /// Aborts the reveal only when it is ticking for `message`.
    pub fn finish(&mut self, message: Uuid) {
        if self.current.as_ref().is_some_and(|t| t.message == message) {
            self.current = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use tokio::sync::mpsc;

    fn channel() -> (EventSender, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventSender { sender }, receiver)
    }

    async fn next_tick(receiver: &mut mpsc::UnboundedReceiver<Event>) -> Uuid {
        match receiver.recv().await {
            Some(Event::App(AppEvent::RevealTick(id))) => id,
            other => panic!("expected reveal tick, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn emits_ticks_for_the_started_message() {
        let (sender, mut receiver) = channel();
        let mut animator = RevealAnimator::new();
        let id = Uuid::new_v4();
        animator.start(id, Duration::from_millis(1), sender);
        for _ in 0..3 {
            assert_eq!(next_tick(&mut receiver).await, id);
        }
        animator.cancel();
    }

    #[tokio::test]
    async fn cancel_stops_the_tick_stream() {
        let (sender, mut receiver) = channel();
        let mut animator = RevealAnimator::new();
        animator.start(Uuid::new_v4(), Duration::from_millis(1), sender);
        next_tick(&mut receiver).await;
        animator.cancel();
        assert!(!animator.is_running());

        // Drain anything queued before the abort landed, then verify
        // the stream has gone quiet.
        tokio::time::sleep(Duration::from_millis(10)).await;
        while receiver.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn starting_a_new_reveal_replaces_the_old_one() {
        let (sender, mut receiver) = channel();
        let mut animator = RevealAnimator::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        animator.start(first, Duration::from_millis(1), sender.clone());
        next_tick(&mut receiver).await;
        animator.start(second, Duration::from_millis(1), sender);

        // After a short settle, only ticks for the new id arrive.
        tokio::time::sleep(Duration::from_millis(10)).await;
        while receiver.try_recv().is_ok() {}
        for _ in 0..3 {
            assert_eq!(next_tick(&mut receiver).await, second);
        }
        animator.cancel();
    }

    #[tokio::test]
    async fn finish_only_cancels_matching_message() {
        let (sender, _receiver) = channel();
        let mut animator = RevealAnimator::new();
        let id = Uuid::new_v4();
        animator.start(id, Duration::from_millis(1), sender);
        animator.finish(Uuid::new_v4());
        assert!(animator.is_running());
        animator.finish(id);
        assert!(!animator.is_running());
    }
}
