//! The four narrow interfaces the core depends on (§6).
//!
//! Every implementation lives outside this crate (a real one talks to an AWS SDK client and a
//! config file format of the embedder's choosing); this module only defines the seams.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    cancel::CancellationToken,
    error::CloudError,
    model::{Capability, ChangeSetInfo, StackConfig, StackEvent},
    tag::Tag,
};

/// The live outputs of a deployed stack, as returned by `get_stack` (used for `StackOutput`
/// lookups in the parameter evaluator, §4.1).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiveStack {
    pub stack_id: String,
    pub outputs: BTreeMap<String, String>,
}

/// A live stack's current parameters and tags, as returned by `describe_stack` (used by the
/// diff engine, §4.5).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackMetadata {
    pub parameters: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
}

/// The inputs needed to create a changeset preview or drive a stack operation (§4.5, §4.6).
#[derive(Clone, Debug)]
pub struct DeploymentRequest {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<Capability>,
}

/// A callback invoked once per streamed [`StackEvent`] while a port waits for a stack operation
/// to settle. `&mut (dyn FnMut + Send)` rather than a bare `dyn FnMut` so the future an
/// `async_trait` method returns remains `Send` while holding this reference across `.await`.
pub type EventSink<'a> = &'a mut (dyn FnMut(StackEvent) + Send);

/// Abstract interface to the cloud provider: stack CRUD, changesets, template validation, event
/// streaming (§6 item 1). Implemented externally; this crate never depends on an AWS SDK.
#[async_trait]
pub trait CloudOperations: Send + Sync {
    /// Does a stack with this name currently exist in `region`?
    async fn stack_exists(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
    ) -> Result<bool, CloudError>;

    /// The live outputs of an existing stack.
    async fn get_stack(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
    ) -> Result<LiveStack, CloudError>;

    /// The live parameters and tags of an existing stack.
    async fn describe_stack(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
    ) -> Result<StackMetadata, CloudError>;

    /// The currently-deployed template body of an existing stack.
    async fn get_template(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
    ) -> Result<String, CloudError>;

    /// Creates a new stack, streaming events to `on_event` until the operation settles.
    async fn deploy_stack_with_callback(
        &self,
        token: &CancellationToken,
        region: &str,
        request: DeploymentRequest,
        on_event: EventSink<'_>,
    ) -> Result<(), CloudError>;

    /// Deletes a stack, streaming events to `on_event` until the operation settles. A no-op if
    /// the stack does not exist.
    async fn delete_stack(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
        on_event: EventSink<'_>,
    ) -> Result<(), CloudError>;

    /// Submits a template for validation, returning the raw error strings the provider reports.
    async fn validate_template(
        &self,
        token: &CancellationToken,
        region: &str,
        template_body: &str,
    ) -> Result<Vec<String>, CloudError>;

    /// Creates a changeset previewing an update to an existing stack.
    async fn create_changeset_for_deployment(
        &self,
        token: &CancellationToken,
        region: &str,
        request: DeploymentRequest,
    ) -> Result<ChangeSetInfo, CloudError>;

    /// Executes a previously-created changeset, streaming events until the operation settles.
    async fn execute_changeset(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
        changeset_id: &str,
        on_event: EventSink<'_>,
    ) -> Result<(), CloudError>;

    /// Deletes a changeset without executing it.
    async fn delete_changeset(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
        changeset_id: &str,
    ) -> Result<(), CloudError>;
}

/// Exposes resolved configuration for a context (§6 item 2). Implemented externally; this crate
/// never parses a config file format itself.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Project-level tags plus the named context's account/region/tags.
    async fn load_context(&self, context: &str) -> Result<crate::model::Context, CloudError>;

    /// Every context name the store knows about.
    async fn list_contexts(&self) -> Result<Vec<String>, CloudError>;

    /// Every stack name declared for a context.
    async fn list_stacks(&self, context: &str) -> Result<Vec<String>, CloudError>;

    /// One stack's declarative configuration within a context.
    async fn get_stack(&self, name: &str, context: &str) -> Result<StackConfig, CloudError>;

    /// Performs store-level validation of the configuration (independent of any stack's
    /// template), such as checking for unresolvable context references.
    async fn validate(&self) -> Result<(), CloudError>;
}

/// Resolves a template locator (path, URI, …) to raw template text (§6 item 3). Implemented
/// externally.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn resolve(&self, locator: &str) -> Result<String, CloudError>;
}

/// Asks the user to confirm or reject a pending action (§6 item 4).
///
/// Dependency-injected into each driver as `Arc<dyn Prompter>` rather than kept as a mutable
/// global, per the "process-wide prompter" design note — a global would be the only mutable
/// global in an otherwise constructor-injected codebase.
pub trait Prompter: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// The default prompter: reads a line from standard input, trims and lower-cases it, and treats
/// `"y"`/`"yes"` as confirmation. Anything else, including EOF, is a refusal.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&self, message: &str) -> bool {
        use std::io::Write as _;

        print!("{message} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}
