//! Long-running pieces of a process: agent runners, relay endpoints and the
//! HTTP API all run as [`Component`]s under one shutdown token.
//!
//! The first component to fail cancels the token and the rest stop with it.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::AppError;

pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

pub trait Component: Send + 'static {
    /// Name used in log fields, e.g. `creator` or `creator-endpoint`.
    fn id(&self) -> &str;

    /// Run until `shutdown` is cancelled or the work is done.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

/// Awaitable result of [`spawn_components`].
pub struct ComponentsHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl ComponentsHandle {
    /// Wait for every component; the first failure wins.
    pub async fn join(self) -> Result<(), AppError> {
        self.inner
            .await
            .unwrap_or_else(|e| Err(AppError::Agent(format!("component supervisor panicked: {e}"))))
    }
}

/// Spawn one task per component and supervise them on a separate task.
pub fn spawn_components(components: Vec<Box<dyn Component>>, shutdown: CancellationToken) -> ComponentsHandle {
    let inner = tokio::spawn(async move {
        let mut set = JoinSet::new();
        for component in components {
            let id = component.id().to_string();
            debug!(component = %id, "starting");
            let run = component.run(shutdown.clone());
            set.spawn(async move { (id, run.await) });
        }

        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            let err = match joined {
                Ok((id, Ok(()))) => {
                    info!(component = %id, "stopped");
                    continue;
                }
                Ok((id, Err(e))) => {
                    error!(component = %id, error = %e, "component failed");
                    e
                }
                Err(e) => {
                    error!(error = %e, "component panicked");
                    AppError::Agent(format!("component panicked: {e}"))
                }
            };
            shutdown.cancel();
            first_err.get_or_insert(err);
        }
        first_err.map_or(Ok(()), Err)
    });

    ComponentsHandle { inner }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Waits(&'static str);

    impl Component for Waits {
        fn id(&self) -> &str {
            self.0
        }
        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    struct Fails;

    impl Component for Fails {
        fn id(&self) -> &str {
            "fails"
        }
        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async { Err(AppError::Agent("boom".into())) })
        }
    }

    #[tokio::test]
    async fn error_cancels_siblings_and_surfaces() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waits("a")), Box::new(Fails)], shutdown.clone());
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn clean_shutdown_is_ok() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waits("a")), Box::new(Waits("b"))], shutdown.clone());
        shutdown.cancel();
        handle.join().await.unwrap();
    }
}
