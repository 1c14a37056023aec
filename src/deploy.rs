//! The deployer (§4.6): the create-new vs update-via-changeset state machine.

use std::sync::Arc;

use crate::{
    cancel::CancellationToken,
    diff::{DiffEngine, DiffOptions},
    error::Error,
    model::{ChangeSetInfo, Stack},
    operation::{OperationOutcome, OperationTracker},
    ports::{CloudOperations, DeploymentRequest, Prompter},
    resolver::StackResolver,
};

/// Drives a stack through the states diagrammed in §4.6.
pub struct Deployer<'a> {
    cloud: &'a dyn CloudOperations,
    prompter: Arc<dyn Prompter>,
}

impl<'a> Deployer<'a> {
    #[must_use]
    pub fn new(cloud: &'a dyn CloudOperations, prompter: Arc<dyn Prompter>) -> Self {
        Self { cloud, prompter }
    }

    /// Deploys a single already-resolved stack.
    #[tracing::instrument(skip(self, token, stack), fields(stack = %stack.name))]
    pub async fn deploy_stack(&self, token: &CancellationToken, stack: &Stack) -> Result<(), Error> {
        let exists = self
            .cloud
            .stack_exists(token, &stack.context.region, &stack.name)
            .await
            .map_err(|source| Error::cloud("failed to check if stack exists", source))?;

        if exists {
            self.deploy_existing(token, stack).await
        } else {
            self.deploy_new(token, stack).await
        }
    }

    /// Resolves then deploys a single stack (§4.6 `deploy_single`).
    pub async fn deploy_single(
        &self,
        token: &CancellationToken,
        resolver: &StackResolver<'_>,
        context: &str,
        name: &str,
    ) -> Result<(), Error> {
        let stack = resolver.resolve(token, context, name).await?;
        self.deploy_stack(token, &stack).await
    }

    /// Lists, orders, freshly resolves, and sequentially deploys every stack in a context
    /// (§4.6 batch rule). A single failure halts the batch, except that a per-stack
    /// `CancellationError` is swallowed as "skip, continue" (§7 exception c).
    pub async fn deploy_all(
        &self,
        token: &CancellationToken,
        resolver: &StackResolver<'_>,
        config: &dyn crate::ports::ConfigStore,
        context: &str,
    ) -> Result<(), Error> {
        let names = config
            .list_stacks(context)
            .await
            .map_err(|source| Error::cloud("failed to list stacks", source))?;
        let order = crate::dependency::DependencyResolver::new(config)
            .order(context, &names)
            .await?;

        for name in &order {
            crate::cancel::check(token, "deploy batch")?;

            let stack = resolver.resolve(token, context, name).await?;
            match self.deploy_stack(token, &stack).await {
                Ok(()) => {}
                Err(Error::Cancellation { stack_name }) => {
                    tracing::info!(stack = %stack_name, "deployment cancelled by user, continuing batch");
                }
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    async fn deploy_new(&self, token: &CancellationToken, stack: &Stack) -> Result<(), Error> {
        let summary = format!(
            "Create new stack '{}' with {} parameter(s) and {} tag(s)?",
            stack.name,
            stack.parameters.len(),
            stack.tags.len()
        );
        if !self.prompter.confirm(&summary) {
            return Err(Error::Cancellation {
                stack_name: stack.name.clone(),
            });
        }

        let request = deployment_request(stack);
        let mut tracker = OperationTracker::new();
        self.cloud
            .deploy_stack_with_callback(token, &stack.context.region, request, &mut |event| {
                tracker.observe(&event);
            })
            .await
            .map_err(|source| Error::cloud("failed to create stack", source))?;

        settle(tracker, &stack.name)
    }

    async fn deploy_existing(&self, token: &CancellationToken, stack: &Stack) -> Result<(), Error> {
        let diff = DiffEngine::new(self.cloud)
            .diff(token, stack, DiffOptions { keep_changeset: true })
            .await?;

        let Some(changeset) = diff.changeset else {
            // No changeset was produced: either there were no effective changes, or creation
            // failed for a reason the diff engine already downgraded to a no-op (§4.5 step 7).
            return Ok(());
        };

        if !changeset_has_changes(&changeset) {
            self.cleanup_changeset(token, stack, &changeset.changeset_id)
                .await;
            return Ok(());
        }

        let message = format!("Do you want to apply these changes to stack {}?", stack.name);
        if !self.prompter.confirm(&message) {
            self.cleanup_changeset(token, stack, &changeset.changeset_id)
                .await;
            return Err(Error::Cancellation {
                stack_name: stack.name.clone(),
            });
        }

        let mut tracker = OperationTracker::new();
        let result = self
            .cloud
            .execute_changeset(
                token,
                &stack.context.region,
                &stack.name,
                &changeset.changeset_id,
                &mut |event| tracker.observe(&event),
            )
            .await;

        // Delete the changeset on every exit path from here, per §3/§9's ownership rule.
        self.cleanup_changeset(token, stack, &changeset.changeset_id)
            .await;

        result.map_err(|source| Error::cloud("failed to execute changeset", source))?;

        settle(tracker, &stack.name)
    }

    async fn cleanup_changeset(&self, token: &CancellationToken, stack: &Stack, changeset_id: &str) {
        if let Err(source) = self
            .cloud
            .delete_changeset(token, &stack.context.region, &stack.name, changeset_id)
            .await
        {
            tracing::warn!(stack = %stack.name, error = %source, "failed to delete changeset, ignoring");
        }
    }
}

fn deployment_request(stack: &Stack) -> DeploymentRequest {
    DeploymentRequest {
        stack_name: stack.name.clone(),
        template_body: stack.template_body.clone(),
        parameters: stack.parameters.clone(),
        tags: stack
            .tags
            .iter()
            .map(|(key, value)| crate::tag::Tag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
        capabilities: stack.effective_capabilities(),
    }
}

fn changeset_has_changes(changeset: &ChangeSetInfo) -> bool {
    !changeset.changes.is_empty()
}

/// Converts a settled `OperationTracker` into the deployer's `Result`, logging (not silencing)
/// resource-level warnings per the ambient-logging design note.
fn settle(tracker: OperationTracker, stack_name: &str) -> Result<(), Error> {
    match tracker.finish(stack_name) {
        OperationOutcome::Ok => Ok(()),
        OperationOutcome::Warning(warning) => {
            tracing::warn!(stack = %stack_name, "{warning}");
            Ok(())
        }
        OperationOutcome::Failure(failure) => Err(Error::Cloud(
            format!("stack operation failed for '{stack_name}'"),
            failure.to_string().into(),
        )),
    }
}

/// Formats one streamed event per §4.6's literal format string.
#[must_use]
pub fn format_event(event: &crate::model::StackEvent) -> String {
    format!(
        "[{}] {:<20} {:<40} {} {}",
        event.timestamp.to_rfc3339(),
        event.resource_status.to_string(),
        event.resource_type,
        event.logical_resource_id,
        event.resource_status_reason.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_format_matches_the_literal_layout() {
        let event = crate::model::StackEvent {
            event_id: "1".to_string(),
            stack_name: "app".to_string(),
            logical_resource_id: "app".to_string(),
            resource_type: "AWS::CloudFormation::Stack".to_string(),
            timestamp: "2024-01-01T00:00:00Z".parse().unwrap(),
            resource_status: crate::status::ResourceStatus::CreateComplete,
            resource_status_reason: None,
        };
        let line = format_event(&event);
        assert!(line.starts_with("[2024-01-01T00:00:00+00:00] "));
        assert!(line.contains("CREATE_COMPLETE"));
        assert!(line.contains("AWS::CloudFormation::Stack"));
        assert!(line.ends_with("app "));
    }

    #[test]
    fn changeset_with_no_changes_is_not_applied() {
        let changeset = ChangeSetInfo {
            changeset_id: "cs-1".to_string(),
            status: crate::status::ChangeSetStatus::CreateComplete,
            changes: Vec::new(),
        };
        assert!(!changeset_has_changes(&changeset));
    }
}
