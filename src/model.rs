//! Shared data types that flow between the drivers in this crate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::status::{ChangeSetStatus, ResourceStatus};

/// A deployment environment: an AWS account + region, plus tags every stack in it inherits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Context {
    pub name: String,
    pub account_id: String,
    pub region: String,
    pub tags: BTreeMap<String, String>,
}

/// The declarative, unresolved configuration for one stack within one context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackConfig {
    pub name: String,
    pub template_locator: String,
    pub parameters: BTreeMap<String, ParameterValue>,
    pub tags: BTreeMap<String, String>,
    pub dependencies: Vec<String>,
    pub capabilities: Vec<Capability>,
}

/// A CloudFormation capability acknowledgement.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, parse_display::Display, parse_display::FromStr,
)]
pub enum Capability {
    #[display("CAPABILITY_IAM")]
    Iam,
    #[display("CAPABILITY_NAMED_IAM")]
    NamedIam,
    #[display("CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

/// A node in the parameter value DSL.
///
/// Exactly one of the three shapes below; modelled as a Rust enum rather than the
/// tag-plus-unused-fields encoding `SPEC_FULL.md` describes for languages without sum types,
/// since Rust has sum types natively.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParameterValue {
    Literal {
        value: String,
    },
    StackOutput {
        stack_name: String,
        output_key: String,
    },
    List {
        items: Vec<ParameterValue>,
    },
}

/// The fully-resolved form of a stack: every `ParameterValue` evaluated, every tag layer merged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stack {
    pub name: String,
    pub context: Context,
    pub template_body: String,
    pub parameters: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    pub capabilities: Vec<Capability>,
    pub dependencies: Vec<String>,
}

impl Stack {
    /// The capabilities to send to the cloud port: the declared ones, or `CAPABILITY_IAM` when
    /// none were declared (§4.6).
    #[must_use]
    pub fn effective_capabilities(&self) -> Vec<Capability> {
        if self.capabilities.is_empty() {
            vec![Capability::Iam]
        } else {
            self.capabilities.clone()
        }
    }
}

/// The kind of change a key underwent between two sides of a comparison.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeType {
    Add,
    Modify,
    Remove,
}

/// One parameter's delta between the live stack and the proposed one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParameterDiff {
    pub key: String,
    pub current_value: Option<String>,
    pub proposed_value: Option<String>,
    pub change_type: ChangeType,
}

/// One tag's delta between the live stack and the proposed one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagDiff {
    pub key: String,
    pub current_value: Option<String>,
    pub proposed_value: Option<String>,
    pub change_type: ChangeType,
}

/// Resource-level add/modify/remove counts produced by the template comparator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResourceCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

/// The result of comparing a current and a proposed template document (§4.4).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateChange {
    pub current_hash: String,
    pub proposed_hash: String,
    pub has_changes: bool,
    pub resource_counts: ResourceCounts,
    pub unified_diff: String,
}

/// Whether a changeset's execution would replace a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq, parse_display::Display, parse_display::FromStr)]
pub enum Replacement {
    True,
    False,
    Conditional,
}

/// The action a changeset entry would take on a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq, parse_display::Display, parse_display::FromStr)]
pub enum Action {
    Add,
    Modify,
    Remove,
}

/// One entry in a changeset: the action CloudFormation would take against one resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceChange {
    pub action: Action,
    pub resource_type: String,
    pub logical_id: String,
    pub physical_id: Option<String>,
    pub replacement: Replacement,
    pub details: Vec<String>,
}

/// A CloudFormation changeset preview, owned by whichever driver last received it (§3, §9).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChangeSetInfo {
    pub changeset_id: String,
    pub status: ChangeSetStatus,
    pub changes: Vec<ResourceChange>,
}

/// The outcome of a three-way comparison for one stack (§3).
#[derive(Clone, Debug, PartialEq)]
pub struct DiffResult {
    pub stack_name: String,
    pub context: String,
    pub stack_exists: bool,
    pub template_change: Option<TemplateChange>,
    pub parameter_diffs: Vec<ParameterDiff>,
    pub tag_diffs: Vec<TagDiff>,
    pub changeset: Option<ChangeSetInfo>,
    pub changeset_error: Option<String>,
}

/// One event in a stack's operation history, as streamed by the cloud port.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackEvent {
    pub event_id: String,
    pub stack_name: String,
    pub logical_resource_id: String,
    pub resource_type: String,
    pub timestamp: DateTime<Utc>,
    pub resource_status: ResourceStatus,
    pub resource_status_reason: Option<String>,
}

impl StackEvent {
    /// Is this event reporting on the stack resource itself, rather than a member resource?
    #[must_use]
    pub fn is_stack_level(&self) -> bool {
        self.logical_resource_id == self.stack_name
    }
}
