use std::future::Future;
use std::time::Duration;

use crate::models::{CoreError, CoreErrorKind};

/// Bounded readiness polling: wait `settle`, then check up to `max_attempts`
/// times with `interval` between checks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    pub settle: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// No waiting between checks.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            settle: Duration::ZERO,
            interval: Duration::ZERO,
            max_attempts,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_attempts == 0 {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                "readiness poll needs at least one attempt",
            ));
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    Satisfied { attempts: u32 },
    Exhausted { attempts: u32 },
}

pub async fn poll_until<F, Fut>(policy: &PollPolicy, mut check: F) -> Result<PollOutcome, CoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<bool, CoreError>>,
{
    if !policy.settle.is_zero() {
        tokio::time::sleep(policy.settle).await;
    }

    for attempt in 1..=policy.max_attempts {
        if check(attempt).await? {
            return Ok(PollOutcome::Satisfied { attempts: attempt });
        }

        if attempt < policy.max_attempts && !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{PollOutcome, PollPolicy, poll_until};
    use crate::models::{CoreError, CoreErrorKind};

    #[tokio::test]
    async fn stops_at_first_satisfied_check() {
        let calls = Cell::new(0u32);
        let outcome = poll_until(&PollPolicy::immediate(5), |attempt| {
            calls.set(calls.get() + 1);
            async move { Ok(attempt == 3) }
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Satisfied { attempts: 3 });
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhausts_attempt_budget() {
        let outcome = poll_until(&PollPolicy::immediate(4), |_| async { Ok(false) })
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 4 });
    }

    #[tokio::test]
    async fn check_errors_abort_the_poll() {
        let error = poll_until(&PollPolicy::immediate(4), |_| async {
            Err(CoreError::new(CoreErrorKind::ProcessFailure, "registry unavailable"))
        })
        .await
        .unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::ProcessFailure);
    }

    #[test]
    fn zero_attempts_is_invalid() {
        assert!(PollPolicy::immediate(0).validate().is_err());
    }
}
