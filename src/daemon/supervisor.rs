use anyhow::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// How a supervised component is restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RestartPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// `0` restarts forever.
    pub max_restarts: u32,
}

impl RestartPolicy {
    /// Long-running daemon components: 2 s doubling up to a minute, unlimited.
    pub const fn daemon() -> Self {
        Self {
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            max_restarts: 0,
        }
    }
}

/// Doubling delay, capped at the policy maximum.
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(policy: RestartPolicy) -> Self {
        let initial = policy.initial_backoff;
        Self {
            initial,
            max: policy.max_backoff.max(initial),
            current: initial,
        }
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

/// Run `run_component` in its own task and start it again whenever it
/// returns. A clean exit resets the backoff; errors keep doubling it.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    policy: RestartPolicy,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = Backoff::new(policy);
        let mut restarts: u32 = 0;

        loop {
            tracing::info!(component = name, restarts, "component starting");
            match run_component().await {
                Ok(()) => {
                    tracing::warn!(component = name, "component exited, restarting");
                    backoff.reset();
                }
                Err(error) => {
                    tracing::error!(component = name, error = %error, "component failed");
                }
            }

            restarts = restarts.saturating_add(1);
            if policy.max_restarts != 0 && restarts > policy.max_restarts {
                tracing::error!(
                    component = name,
                    max_restarts = policy.max_restarts,
                    "component exceeded max restarts, giving up"
                );
                return;
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
    })
}
