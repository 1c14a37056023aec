//! The deleter (§4.7): a smaller driver sharing the resolver and cloud port.

use std::sync::Arc;

use crate::{
    cancel::CancellationToken,
    dependency::{self, DependencyResolver},
    describe::Describer,
    error::Error,
    operation::{OperationOutcome, OperationTracker},
    ports::{CloudOperations, ConfigStore, Prompter},
};

/// Drives stack deletion.
pub struct Deleter<'a> {
    cloud: &'a dyn CloudOperations,
    prompter: Arc<dyn Prompter>,
}

impl<'a> Deleter<'a> {
    #[must_use]
    pub fn new(cloud: &'a dyn CloudOperations, prompter: Arc<dyn Prompter>) -> Self {
        Self { cloud, prompter }
    }

    /// Deletes a single stack by name. A no-op if the stack doesn't exist; otherwise describes
    /// the live stack for the user's context before prompting (§4.7).
    pub async fn delete_stack(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
    ) -> Result<(), Error> {
        let description = Describer::new(self.cloud)
            .describe(token, region, stack_name)
            .await?;
        if !description.exists {
            return Ok(());
        }

        let message = format!(
            "Do you want to delete stack {stack_name} ({} parameter(s), {} tag(s), {} output(s))? This cannot be undone.",
            description.parameters.len(),
            description.tags.len(),
            description.outputs.len(),
        );
        if !self.prompter.confirm(&message) {
            return Err(Error::Cancellation {
                stack_name: stack_name.to_string(),
            });
        }

        let mut tracker = OperationTracker::new();
        self.cloud
            .delete_stack(token, region, stack_name, &mut |event| {
                tracker.observe(&event);
            })
            .await
            .map_err(|source| Error::cloud("failed to delete stack", source))?;

        match tracker.finish(stack_name) {
            OperationOutcome::Ok => Ok(()),
            OperationOutcome::Warning(warning) => {
                tracing::warn!(stack = %stack_name, "{warning}");
                Ok(())
            }
            OperationOutcome::Failure(failure) => Err(Error::Cloud(
                format!("stack deletion failed for '{stack_name}'"),
                failure.to_string().into(),
            )),
        }
    }

    /// Deletes every stack in a context, in reverse dependency order (§4.7). A per-stack
    /// `CancellationError` is treated as "skip, continue" to match the batch-deploy behaviour.
    pub async fn delete_all(
        &self,
        token: &CancellationToken,
        config: &dyn ConfigStore,
        context: &str,
        region: &str,
    ) -> Result<(), Error> {
        let names = config
            .list_stacks(context)
            .await
            .map_err(|source| Error::cloud("failed to list stacks", source))?;
        let order = DependencyResolver::new(config).order(context, &names).await?;
        let reverse_order = dependency::reverse(order);

        for name in &reverse_order {
            crate::cancel::check(token, "delete batch")?;

            match self.delete_stack(token, region, name).await {
                Ok(()) => {}
                Err(Error::Cancellation { stack_name }) => {
                    tracing::info!(stack = %stack_name, "deletion cancelled by user, continuing batch");
                }
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }
}
