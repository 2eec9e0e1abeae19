use std::time::Duration;

/// Fire-once, non-cancellable wakeups delivered back to the event loop.
pub trait TimerInterface {
    type Token;

    fn wakeup(&mut self, after: Duration, token: Self::Token);
}
