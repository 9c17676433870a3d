use std::time::{Duration, Instant};

/// Token-bucket pacer for upstream fetches.
///
/// Unlike a limiter that rejects, this one tells the caller how long to wait;
/// debt accumulates so back-to-back callers queue behind each other.
#[derive(Clone, Debug)]
pub struct Pacer {
    max_tokens: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_update: Instant,
}

impl Pacer {
    pub fn new(max_rps: f64) -> Self {
        let max = max_rps.max(1e-9);
        Self {
            max_tokens: max,
            refill_per_sec: max,
            tokens: max,
            last_update: Instant::now(),
        }
    }

    /// Take one token, returning the delay the caller must observe first.
    pub fn reserve_at(&mut self, now: Instant) -> Duration {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Duration::ZERO;
        }

        let secs = (1.0 - self.tokens) / self.refill_per_sec;
        self.tokens -= 1.0;
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub async fn wait(&mut self) {
        let delay = self.reserve_at(Instant::now());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
