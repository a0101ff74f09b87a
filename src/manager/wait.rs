//! Readiness polling.

use super::{ResourceManager, WaitOptions};
use crate::client::{ClusterClient, Context};
use crate::error::ApplyError;
use crate::object::Object;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

impl<C: ClusterClient> ResourceManager<C> {
    /// Blocks until every object reports ready.
    ///
    /// Objects are polled every `opts.interval`; only the ones not yet ready
    /// are asked again. Fails with [`ApplyError::WaitTimeout`] listing the
    /// stragglers once `opts.timeout` has passed, or earlier when `ctx` is
    /// done.
    pub async fn wait(
        &self,
        ctx: &Context,
        objects: &[Object],
        opts: WaitOptions,
    ) -> Result<(), ApplyError> {
        let deadline = Instant::now() + opts.timeout;
        let interrupted = |cause| ApplyError::Cancelled { object: None, cause };

        let mut pending: Vec<&Object> = objects.iter().collect();
        loop {
            let mut not_ready = Vec::with_capacity(pending.len());
            for object in pending {
                let ready = match ctx.run(timeout_at(deadline, self.client.is_ready(object))).await {
                    Err(cause) => return Err(interrupted(cause)),
                    Ok(Err(_elapsed)) => {
                        not_ready.push(object);
                        continue;
                    }
                    Ok(Ok(ready)) => ready.map_err(|source| ApplyError::Readiness {
                        object: object.object_ref(),
                        source,
                    })?,
                };
                if !ready {
                    not_ready.push(object);
                }
            }
            pending = not_ready;

            if pending.is_empty() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ApplyError::WaitTimeout {
                    pending: pending.iter().map(|o| o.object_ref()).collect(),
                    timeout: opts.timeout,
                });
            }
            debug!(pending = pending.len(), "waiting for objects to become ready");
            let pause = opts.interval.min(deadline - now);
            ctx.sleep(pause).await.map_err(interrupted)?;
        }
    }
}
