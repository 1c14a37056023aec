//! The validator (§4.7): runs each stack's template past the cloud port's validator and turns
//! the provider's free-text error strings into structured [`ValidationIssue`]s, the same way
//! `status_reason` classifies free-text status reasons.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    cancel::CancellationToken,
    error::{Error, ValidationIssue},
    ports::CloudOperations,
    resolver::StackResolver,
};

/// Validates a single stack's resolved template.
pub struct Validator<'a> {
    cloud: &'a dyn CloudOperations,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(cloud: &'a dyn CloudOperations) -> Self {
        Self { cloud }
    }

    /// Resolves `stack_name`, then submits its template for validation (§4.7).
    pub async fn validate(
        &self,
        token: &CancellationToken,
        resolver: &StackResolver<'_>,
        context: &str,
        stack_name: &str,
    ) -> Result<(), Error> {
        let stack = resolver.resolve(token, context, stack_name).await?;

        let raw_issues = self
            .cloud
            .validate_template(token, &stack.context.region, &stack.template_body)
            .await
            .map_err(|source| Error::cloud("failed to validate template", source))?;

        if raw_issues.is_empty() {
            return Ok(());
        }

        let issues = raw_issues.iter().map(|raw| classify(raw)).collect();
        Err(Error::Validation(issues))
    }

    /// Validates every stack in a context, returning every stack's issues together rather than
    /// stopping at the first failure, so batch callers can report a full summary (§4.7).
    pub async fn validate_all(
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

        let mut failures = Vec::new();
        for name in &names {
            crate::cancel::check(token, "validate batch")?;

            if let Err(Error::Validation(issues)) = self.validate(token, resolver, context, name).await {
                failures.extend(issues);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(failures))
        }
    }
}

/// Categorizes one raw validation error string.
fn classify(reason: &str) -> ValidationIssue {
    lazy_static! {
        static ref UNRECOGNIZED_RESOURCE_TYPE: Regex =
            Regex::new(r"(?i)Unrecognized resource types?: \[?(?P<types>[^\]]+)\]?").unwrap();
        static ref INVALID_PARAMETER_TYPE: Regex =
            Regex::new(r"(?i)(?P<parameter>\w+) is not a valid (?:parameter )?type").unwrap();
        static ref UNDEFINED_REFERENCE: Regex =
            Regex::new(r#"(?i)Template error: instance of Fn::(?:GetAtt|Ref|Sub) .*? (?P<ref>\S+) (?:is not defined|does not exist)"#).unwrap();
        static ref MALFORMED: Regex = Regex::new(r"(?i)(?:Invalid template|malformed): (?:JSON|YAML)").unwrap();
        static ref MISSING_PROPERTY: Regex =
            Regex::new(r"(?i)Property (?P<property>\S+) is required").unwrap();
        static ref FORMAT_ERROR: Regex = Regex::new(r"(?i)Template format error").unwrap();
    }

    if let Some(m) = UNRECOGNIZED_RESOURCE_TYPE.captures(reason) {
        return ValidationIssue {
            title: "Unrecognized resource type".to_string(),
            detail: m.name("types").unwrap().as_str().trim().to_string(),
        };
    }
    if let Some(m) = INVALID_PARAMETER_TYPE.captures(reason) {
        return ValidationIssue {
            title: "Invalid parameter type".to_string(),
            detail: format!("parameter '{}'", &m["parameter"]),
        };
    }
    if let Some(m) = UNDEFINED_REFERENCE.captures(reason) {
        return ValidationIssue {
            title: "Undefined reference".to_string(),
            detail: m.name("ref").unwrap().as_str().to_string(),
        };
    }
    if MALFORMED.is_match(reason) {
        return ValidationIssue {
            title: "Malformed template body".to_string(),
            detail: reason.to_string(),
        };
    }
    if let Some(m) = MISSING_PROPERTY.captures(reason) {
        return ValidationIssue {
            title: "Missing required property".to_string(),
            detail: m.name("property").unwrap().as_str().to_string(),
        };
    }
    if FORMAT_ERROR.is_match(reason) {
        return ValidationIssue {
            title: "Template format error".to_string(),
            detail: reason.to_string(),
        };
    }

    ValidationIssue {
        title: "Validation error".to_string(),
        detail: reason.to_string(),
    }
}
