use std::time::Duration;

use tokio::time::Instant;

/// Quiescence timer: every `touch` pushes the deadline out by `delay`, and the
/// owner fires once the deadline passes without another touch.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarms and reports whether the deadline had passed.
    pub fn fire_if_due(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn touches_extend_the_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        assert!(!debouncer.fire_if_due());

        debouncer.touch();
        tokio::time::advance(Duration::from_millis(300)).await;
        debouncer.touch();
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(!debouncer.fire_if_due());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(debouncer.fire_if_due());
        assert!(!debouncer.is_armed());
        assert!(!debouncer.fire_if_due());
    }
}
