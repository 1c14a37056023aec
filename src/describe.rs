//! The describer (§4.7): a read-only passthrough to the cloud port.

use crate::{cancel::CancellationToken, error::Error, ports::CloudOperations};

/// A display-friendly snapshot of a live stack's current state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackDescription {
    pub stack_name: String,
    pub exists: bool,
    pub parameters: std::collections::BTreeMap<String, String>,
    pub tags: std::collections::BTreeMap<String, String>,
    pub outputs: std::collections::BTreeMap<String, String>,
}

/// Reads live stack state without mutating anything.
pub struct Describer<'a> {
    cloud: &'a dyn CloudOperations,
}

impl<'a> Describer<'a> {
    #[must_use]
    pub fn new(cloud: &'a dyn CloudOperations) -> Self {
        Self { cloud }
    }

    pub async fn describe(
        &self,
        token: &CancellationToken,
        region: &str,
        stack_name: &str,
    ) -> Result<StackDescription, Error> {
        let exists = self
            .cloud
            .stack_exists(token, region, stack_name)
            .await
            .map_err(|source| Error::cloud("failed to check if stack exists", source))?;

        if !exists {
            return Ok(StackDescription {
                stack_name: stack_name.to_string(),
                exists: false,
                parameters: Default::default(),
                tags: Default::default(),
                outputs: Default::default(),
            });
        }

        let metadata = self
            .cloud
            .describe_stack(token, region, stack_name)
            .await
            .map_err(|source| Error::cloud("failed to describe stack", source))?;
        let live = self
            .cloud
            .get_stack(token, region, stack_name)
            .await
            .map_err(|source| Error::cloud("failed to get stack", source))?;

        Ok(StackDescription {
            stack_name: stack_name.to_string(),
            exists: true,
            parameters: metadata.parameters,
            tags: metadata.tags,
            outputs: live.outputs,
        })
    }
}
