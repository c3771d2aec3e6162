use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eyre::{eyre, Result, WrapErr};
use tokio::runtime::Runtime;
use tracing::{error, instrument, trace};

use crate::command::CommandSender;
use crate::handler::HandlerObject;
use crate::{LoadCtx, LoadError};

pub(crate) fn build_runtime(worker_threads: usize) -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name_fn(|| {
            static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
            let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
            format!("resources-{}", id)
        })
        .enable_time()
        .build()
        .wrap_err("failed to create tokio runtime")
}

/// One handler pipeline for one canonical identifier.
pub(crate) struct Task {
    pub canonical: Arc<str>,
    pub handler: HandlerObject,
    pub ctx: LoadCtx,
    pub command_sender: CommandSender,
}

impl Task {
    pub fn spawn(self, runtime: &Runtime) {
        runtime.spawn(self.execute());
    }

    #[instrument(skip_all, fields(identifier = %self.canonical, ty = ?self.handler.ty()))]
    async fn execute(self) {
        let Task {
            canonical,
            handler,
            mut ctx,
            command_sender,
        } = self;

        trace!(handler = handler.handler_name(), "loading");

        // Run the pipeline in its own task so a panicking handler still
        // frees its slot.
        let pipeline = {
            let canonical = canonical.clone();
            tokio::spawn(async move { handler.run(&mut ctx, &canonical).await })
        };

        let result = match pipeline.await {
            Ok(result) => result,
            Err(join_error) => Err(eyre!("handler task failed: {}", join_error)),
        };

        match &result {
            Ok(_) => trace!("loaded"),
            Err(error) => error!(?error, "load failed"),
        }

        command_sender.complete(canonical, result.map_err(LoadError::from));
    }
}
