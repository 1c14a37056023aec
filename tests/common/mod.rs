//! Mock port implementations driving the end-to-end scenarios in `tests/scenarios.rs`.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use stackwright::{
    cancel::CancellationToken,
    model::{ChangeSetInfo, Context, StackConfig, StackEvent},
    ports::{
        CloudOperations, ConfigStore, DeploymentRequest, EventSink, LiveStack, Prompter,
        StackMetadata, TemplateSource,
    },
    status::ChangeSetStatus,
    CloudError,
};

/// A cloud port backed entirely by in-memory fixtures, with no real network calls.
#[derive(Default)]
pub struct MockCloud {
    pub existing_stacks: Mutex<BTreeMap<String, StackMetadata>>,
    pub outputs: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    pub deploy_calls: Mutex<Vec<DeploymentRequest>>,
    pub deleted_changesets: Mutex<Vec<String>>,
}

#[async_trait]
impl CloudOperations for MockCloud {
    async fn stack_exists(
        &self,
        _token: &CancellationToken,
        _region: &str,
        stack_name: &str,
    ) -> Result<bool, CloudError> {
        Ok(self.existing_stacks.lock().unwrap().contains_key(stack_name))
    }

    async fn get_stack(
        &self,
        _token: &CancellationToken,
        _region: &str,
        stack_name: &str,
    ) -> Result<LiveStack, CloudError> {
        let outputs = self
            .outputs
            .lock()
            .unwrap()
            .get(stack_name)
            .cloned()
            .unwrap_or_default();
        Ok(LiveStack {
            stack_id: stack_name.to_string(),
            outputs,
        })
    }

    async fn describe_stack(
        &self,
        _token: &CancellationToken,
        _region: &str,
        stack_name: &str,
    ) -> Result<StackMetadata, CloudError> {
        self.existing_stacks
            .lock()
            .unwrap()
            .get(stack_name)
            .cloned()
            .ok_or_else(|| -> CloudError { "stack not found".into() })
    }

    async fn get_template(
        &self,
        _token: &CancellationToken,
        _region: &str,
        _stack_name: &str,
    ) -> Result<String, CloudError> {
        Ok("Resources: {}".to_string())
    }

    async fn deploy_stack_with_callback(
        &self,
        _token: &CancellationToken,
        _region: &str,
        request: DeploymentRequest,
        on_event: EventSink<'_>,
    ) -> Result<(), CloudError> {
        on_event(terminal_event(&request.stack_name));
        self.existing_stacks.lock().unwrap().insert(
            request.stack_name.clone(),
            StackMetadata {
                parameters: request.parameters.clone(),
                tags: request
                    .tags
                    .iter()
                    .map(|t| (t.key.clone(), t.value.clone()))
                    .collect(),
            },
        );
        self.deploy_calls.lock().unwrap().push(request);
        Ok(())
    }

    async fn delete_stack(
        &self,
        _token: &CancellationToken,
        _region: &str,
        stack_name: &str,
        on_event: EventSink<'_>,
    ) -> Result<(), CloudError> {
        on_event(terminal_event(stack_name));
        self.existing_stacks.lock().unwrap().remove(stack_name);
        Ok(())
    }

    async fn validate_template(
        &self,
        _token: &CancellationToken,
        _region: &str,
        _template_body: &str,
    ) -> Result<Vec<String>, CloudError> {
        Ok(Vec::new())
    }

    async fn create_changeset_for_deployment(
        &self,
        _token: &CancellationToken,
        _region: &str,
        request: DeploymentRequest,
    ) -> Result<ChangeSetInfo, CloudError> {
        let existing = self
            .existing_stacks
            .lock()
            .unwrap()
            .get(&request.stack_name)
            .cloned();

        let has_changes = match existing {
            Some(metadata) => metadata.parameters != request.parameters,
            None => true,
        };

        if !has_changes {
            return Err("The submitted information didn't contain changes.".into());
        }

        Ok(ChangeSetInfo {
            changeset_id: format!("{}-changeset", request.stack_name),
            status: ChangeSetStatus::CreateComplete,
            changes: vec![one_modify_change()],
        })
    }

    async fn execute_changeset(
        &self,
        _token: &CancellationToken,
        _region: &str,
        stack_name: &str,
        _changeset_id: &str,
        on_event: EventSink<'_>,
    ) -> Result<(), CloudError> {
        on_event(terminal_event(stack_name));
        Ok(())
    }

    async fn delete_changeset(
        &self,
        _token: &CancellationToken,
        _region: &str,
        _stack_name: &str,
        changeset_id: &str,
    ) -> Result<(), CloudError> {
        self.deleted_changesets
            .lock()
            .unwrap()
            .push(changeset_id.to_string());
        Ok(())
    }
}

pub fn one_modify_change() -> stackwright::model::ResourceChange {
    stackwright::model::ResourceChange {
        action: stackwright::model::Action::Modify,
        resource_type: "AWS::S3::Bucket".to_string(),
        logical_id: "Bucket".to_string(),
        physical_id: Some("bucket-123".to_string()),
        replacement: stackwright::model::Replacement::False,
        details: Vec::new(),
    }
}

fn terminal_event(stack_name: &str) -> StackEvent {
    StackEvent {
        event_id: format!("{stack_name}-terminal"),
        stack_name: stack_name.to_string(),
        logical_resource_id: stack_name.to_string(),
        resource_type: "AWS::CloudFormation::Stack".to_string(),
        timestamp: chrono::Utc::now(),
        resource_status: stackwright::status::ResourceStatus::UpdateComplete,
        resource_status_reason: None,
    }
}

/// A config store backed entirely by in-memory fixtures.
#[derive(Default)]
pub struct MockConfigStore {
    pub contexts: BTreeMap<String, Context>,
    pub stacks: BTreeMap<String, StackConfig>,
}

#[async_trait]
impl ConfigStore for MockConfigStore {
    async fn load_context(&self, context: &str) -> Result<Context, CloudError> {
        self.contexts
            .get(context)
            .cloned()
            .ok_or_else(|| -> CloudError { format!("no such context '{context}'").into() })
    }

    async fn list_contexts(&self) -> Result<Vec<String>, CloudError> {
        Ok(self.contexts.keys().cloned().collect())
    }

    async fn list_stacks(&self, _context: &str) -> Result<Vec<String>, CloudError> {
        Ok(self.stacks.keys().cloned().collect())
    }

    async fn get_stack(&self, name: &str, _context: &str) -> Result<StackConfig, CloudError> {
        self.stacks
            .get(name)
            .cloned()
            .ok_or_else(|| -> CloudError { format!("no such stack '{name}'").into() })
    }

    async fn validate(&self) -> Result<(), CloudError> {
        Ok(())
    }
}

pub struct MockTemplateSource {
    pub body: String,
}

#[async_trait]
impl TemplateSource for MockTemplateSource {
    async fn resolve(&self, _locator: &str) -> Result<String, CloudError> {
        Ok(self.body.clone())
    }
}

/// A prompter whose answer is fixed at construction time, and that records whether it was
/// asked.
pub struct FixedPrompter {
    answer: bool,
    asked: Arc<Mutex<bool>>,
}

impl FixedPrompter {
    #[must_use]
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Arc::new(Mutex::new(false)),
        }
    }

    #[must_use]
    pub fn was_asked(&self) -> bool {
        *self.asked.lock().unwrap()
    }
}

impl Prompter for FixedPrompter {
    fn confirm(&self, _message: &str) -> bool {
        *self.asked.lock().unwrap() = true;
        self.answer
    }
}
