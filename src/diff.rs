//! The diff engine (§4.5): a three-way comparison for one resolved stack.

use std::collections::BTreeSet;

use crate::{
    cancel::CancellationToken,
    error::Error,
    model::{ChangeType, DiffResult, ParameterDiff, Stack, TagDiff},
    ports::{CloudOperations, DeploymentRequest},
    template_diff,
};

/// A changeset creation failure whose reason matches CloudFormation's family of "nothing to
/// update" messages is downgraded to a clean no-op rather than surfaced as `changeset_error`
/// (§4.5 step 7, open question resolved in `DESIGN.md`).
fn is_no_op_changeset_failure(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    reason.contains("didn't contain changes") || reason.contains("no updates are to be performed")
}

/// Options controlling changeset lifecycle for one diff call (§4.5).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiffOptions {
    /// If `true`, a successfully-created changeset is returned for the caller to own and later
    /// execute or delete. If `false`, this engine deletes it before returning (§3, §9).
    pub keep_changeset: bool,
}

/// Produces `DiffResult`s for resolved stacks.
pub struct DiffEngine<'a> {
    cloud: &'a dyn CloudOperations,
}

impl<'a> DiffEngine<'a> {
    #[must_use]
    pub fn new(cloud: &'a dyn CloudOperations) -> Self {
        Self { cloud }
    }

    pub async fn diff(
        &self,
        token: &CancellationToken,
        stack: &Stack,
        opts: DiffOptions,
    ) -> Result<DiffResult, Error> {
        let exists = self
            .cloud
            .stack_exists(token, &stack.context.region, &stack.name)
            .await
            .map_err(|source| Error::cloud("failed to check if stack exists", source))?;

        if !exists {
            return Ok(new_stack_diff(stack));
        }

        let current_template = self
            .cloud
            .get_template(token, &stack.context.region, &stack.name)
            .await
            .map_err(|source| Error::cloud("failed to get current template", source))?;
        let metadata = self
            .cloud
            .describe_stack(token, &stack.context.region, &stack.name)
            .await
            .map_err(|source| Error::cloud("failed to describe stack", source))?;

        let template_change = template_diff::compare(&current_template, &stack.template_body)?;

        let parameter_diffs = diff_maps(&metadata.parameters, &stack.parameters);
        let tag_diffs = diff_maps(&metadata.tags, &stack.tags);

        let request = DeploymentRequest {
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
        };

        let (changeset, changeset_error) = match self
            .cloud
            .create_changeset_for_deployment(token, &stack.context.region, request)
            .await
        {
            Ok(changeset) => {
                if !opts.keep_changeset {
                    if let Err(source) = self
                        .cloud
                        .delete_changeset(
                            token,
                            &stack.context.region,
                            &stack.name,
                            &changeset.changeset_id,
                        )
                        .await
                    {
                        tracing::warn!(stack = %stack.name, error = %source, "failed to delete changeset after diff");
                    }
                    (None, None)
                } else {
                    (Some(changeset), None)
                }
            }
            Err(source) if is_no_op_changeset_failure(&source.to_string()) => (None, None),
            Err(source) => (None, Some(source.to_string())),
        };

        Ok(DiffResult {
            stack_name: stack.name.clone(),
            context: stack.context.name.clone(),
            stack_exists: true,
            template_change: Some(template_change),
            parameter_diffs,
            tag_diffs,
            changeset,
            changeset_error,
        })
    }
}

fn new_stack_diff(stack: &Stack) -> DiffResult {
    let parameter_diffs = stack
        .parameters
        .iter()
        .map(|(key, value)| ParameterDiff {
            key: key.clone(),
            current_value: None,
            proposed_value: Some(value.clone()),
            change_type: ChangeType::Add,
        })
        .collect();
    let tag_diffs = stack
        .tags
        .iter()
        .map(|(key, value)| TagDiff {
            key: key.clone(),
            current_value: None,
            proposed_value: Some(value.clone()),
            change_type: ChangeType::Add,
        })
        .collect();

    DiffResult {
        stack_name: stack.name.clone(),
        context: stack.context.name.clone(),
        stack_exists: false,
        template_change: None,
        parameter_diffs,
        tag_diffs,
        changeset: None,
        changeset_error: None,
    }
}

/// Computes §4.5's "set-symmetric-difference over map keys, classifying shared keys by value
/// equality" for both `ParameterDiff` and `TagDiff`, which share the same shape.
fn diff_maps<T>(
    current: &std::collections::BTreeMap<String, String>,
    proposed: &std::collections::BTreeMap<String, String>,
) -> Vec<T>
where
    T: DiffEntry,
{
    let keys: BTreeSet<&String> = current.keys().chain(proposed.keys()).collect();
    let mut diffs = Vec::new();

    for key in keys {
        let current_value = current.get(key);
        let proposed_value = proposed.get(key);
        let change_type = match (current_value, proposed_value) {
            (None, Some(_)) => Some(ChangeType::Add),
            (Some(_), None) => Some(ChangeType::Remove),
            (Some(current_value), Some(proposed_value)) if current_value != proposed_value => {
                Some(ChangeType::Modify)
            }
            _ => None,
        };
        if let Some(change_type) = change_type {
            diffs.push(T::new(
                key.clone(),
                current_value.cloned(),
                proposed_value.cloned(),
                change_type,
            ));
        }
    }

    diffs
}

/// Lets `diff_maps` build either `ParameterDiff` or `TagDiff` without duplicating its logic.
trait DiffEntry {
    fn new(
        key: String,
        current_value: Option<String>,
        proposed_value: Option<String>,
        change_type: ChangeType,
    ) -> Self;
}

impl DiffEntry for ParameterDiff {
    fn new(
        key: String,
        current_value: Option<String>,
        proposed_value: Option<String>,
        change_type: ChangeType,
    ) -> Self {
        Self {
            key,
            current_value,
            proposed_value,
            change_type,
        }
    }
}

impl DiffEntry for TagDiff {
    fn new(
        key: String,
        current_value: Option<String>,
        proposed_value: Option<String>,
        change_type: ChangeType,
    ) -> Self {
        Self {
            key,
            current_value,
            proposed_value,
            change_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn diff_maps_classifies_add_modify_remove() {
        let current = BTreeMap::from([
            ("Keep".to_string(), "same".to_string()),
            ("Removed".to_string(), "gone".to_string()),
            ("Changed".to_string(), "old".to_string()),
        ]);
        let proposed = BTreeMap::from([
            ("Keep".to_string(), "same".to_string()),
            ("Changed".to_string(), "new".to_string()),
            ("Added".to_string(), "fresh".to_string()),
        ]);

        let diffs: Vec<ParameterDiff> = diff_maps(&current, &proposed);
        let mut by_key: BTreeMap<_, _> = diffs.into_iter().map(|d| (d.key.clone(), d)).collect();

        assert_eq!(by_key.remove("Added").unwrap().change_type, ChangeType::Add);
        assert_eq!(
            by_key.remove("Removed").unwrap().change_type,
            ChangeType::Remove
        );
        assert_eq!(
            by_key.remove("Changed").unwrap().change_type,
            ChangeType::Modify
        );
        assert!(by_key.is_empty());
    }

    #[test]
    fn no_op_changeset_failure_reasons_are_recognised() {
        assert!(is_no_op_changeset_failure(
            "The submitted information didn't contain changes."
        ));
        assert!(is_no_op_changeset_failure(
            "No updates are to be performed."
        ));
        assert!(!is_no_op_changeset_failure("Invalid template property"));
    }
}
