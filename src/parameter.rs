//! The parameter evaluator (§4.1): a recursive evaluator over the `ParameterValue` DSL.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    cancel::{self, CancellationToken},
    error::{resolution, Error},
    model::ParameterValue,
    ports::CloudOperations,
};

/// Evaluates `ParameterValue` trees against a cloud port.
pub struct ParameterEvaluator<'a> {
    cloud: &'a dyn CloudOperations,
}

impl<'a> ParameterEvaluator<'a> {
    #[must_use]
    pub fn new(cloud: &'a dyn CloudOperations) -> Self {
        Self { cloud }
    }

    /// Evaluates a single `ParameterValue` to a concrete string.
    pub async fn evaluate(
        &self,
        token: &CancellationToken,
        value: &ParameterValue,
        region: &str,
    ) -> Result<String, Error> {
        cancel::check(token, "evaluate parameter")?;

        match value {
            ParameterValue::Literal { value } => Ok(value.clone()),

            ParameterValue::StackOutput {
                stack_name,
                output_key,
            } => {
                let live_stack = self
                    .cloud
                    .get_stack(token, region, stack_name)
                    .await
                    .map_err(|source| {
                        Error::cloud(format!("failed to get stack '{stack_name}'"), source)
                    })?;

                live_stack.outputs.get(output_key).cloned().ok_or_else(|| {
                    Error::CrossStackLookup(format!(
                        "stack '{stack_name}' does not have output '{output_key}'"
                    ))
                })
            }

            ParameterValue::List { items } => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    let value = Box::pin(self.evaluate(token, item, region)).await?;
                    if !value.is_empty() {
                        resolved.push(value);
                    }
                }
                Ok(resolved.join(","))
            }
        }
    }

    /// Evaluates every entry of a parameter map. The iteration order across names is not
    /// observable (§4.1); this crate uses a `BTreeMap` internally for determinism regardless.
    pub async fn evaluate_all(
        &self,
        token: &CancellationToken,
        values: &BTreeMap<String, ParameterValue>,
        region: &str,
    ) -> Result<BTreeMap<String, String>, Error> {
        let mut resolved = BTreeMap::new();
        for (name, value) in values {
            let evaluated = self.evaluate(token, value, region).await.map_err(|error| {
                resolution(&format!("failed to resolve parameter '{name}'"), error)
            })?;
            resolved.insert(name.clone(), evaluated);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::CloudError,
        ports::{DeploymentRequest, EventSink, LiveStack, StackMetadata},
    };

    struct FakeCloud {
        outputs: BTreeMap<String, BTreeMap<String, String>>,
    }

    #[async_trait]
    impl CloudOperations for FakeCloud {
        async fn stack_exists(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _stack_name: &str,
        ) -> Result<bool, CloudError> {
            unimplemented!()
        }

        async fn get_stack(
            &self,
            _token: &CancellationToken,
            _region: &str,
            stack_name: &str,
        ) -> Result<LiveStack, CloudError> {
            let outputs = self
                .outputs
                .get(stack_name)
                .cloned()
                .ok_or_else(|| -> CloudError { format!("no such stack '{stack_name}'").into() })?;
            Ok(LiveStack {
                stack_id: stack_name.to_string(),
                outputs,
            })
        }

        async fn describe_stack(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _stack_name: &str,
        ) -> Result<StackMetadata, CloudError> {
            unimplemented!()
        }

        async fn get_template(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _stack_name: &str,
        ) -> Result<String, CloudError> {
            unimplemented!()
        }

        async fn deploy_stack_with_callback(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _request: DeploymentRequest,
            _on_event: EventSink<'_>,
        ) -> Result<(), CloudError> {
            unimplemented!()
        }

        async fn delete_stack(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _stack_name: &str,
            _on_event: EventSink<'_>,
        ) -> Result<(), CloudError> {
            unimplemented!()
        }

        async fn validate_template(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _template_body: &str,
        ) -> Result<Vec<String>, CloudError> {
            unimplemented!()
        }

        async fn create_changeset_for_deployment(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _request: DeploymentRequest,
        ) -> Result<crate::model::ChangeSetInfo, CloudError> {
            unimplemented!()
        }

        async fn execute_changeset(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _stack_name: &str,
            _changeset_id: &str,
            _on_event: EventSink<'_>,
        ) -> Result<(), CloudError> {
            unimplemented!()
        }

        async fn delete_changeset(
            &self,
            _token: &CancellationToken,
            _region: &str,
            _stack_name: &str,
            _changeset_id: &str,
        ) -> Result<(), CloudError> {
            unimplemented!()
        }
    }

    fn fake_cloud() -> FakeCloud {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "security".to_string(),
            BTreeMap::from([("WebSGId".to_string(), "sg-web".to_string())]),
        );
        outputs.insert(
            "db".to_string(),
            BTreeMap::from([("DatabaseSGId".to_string(), "sg-db".to_string())]),
        );
        FakeCloud { outputs }
    }

    #[tokio::test]
    async fn literal() {
        let cloud = fake_cloud();
        let evaluator = ParameterEvaluator::new(&cloud);
        let token = CancellationToken::new();
        let value = ParameterValue::Literal {
            value: "hello".to_string(),
        };
        assert_eq!(
            evaluator.evaluate(&token, &value, "us-east-1").await.unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn stack_output_missing_key() {
        let cloud = fake_cloud();
        let evaluator = ParameterEvaluator::new(&cloud);
        let token = CancellationToken::new();
        let value = ParameterValue::StackOutput {
            stack_name: "security".to_string(),
            output_key: "NoSuchKey".to_string(),
        };
        assert_matches!(
            evaluator.evaluate(&token, &value, "us-east-1").await,
            Err(Error::CrossStackLookup(_))
        );
    }

    // Scenario 1 (§8): mixed list resolution.
    #[tokio::test]
    async fn mixed_list_resolution() {
        let cloud = fake_cloud();
        let evaluator = ParameterEvaluator::new(&cloud);
        let token = CancellationToken::new();
        let value = ParameterValue::List {
            items: vec![
                ParameterValue::Literal {
                    value: "sg-base".to_string(),
                },
                ParameterValue::StackOutput {
                    stack_name: "security".to_string(),
                    output_key: "WebSGId".to_string(),
                },
                ParameterValue::StackOutput {
                    stack_name: "db".to_string(),
                    output_key: "DatabaseSGId".to_string(),
                },
                ParameterValue::Literal {
                    value: "sg-extra".to_string(),
                },
            ],
        };
        assert_eq!(
            evaluator.evaluate(&token, &value, "us-east-1").await.unwrap(),
            "sg-base,sg-web,sg-db,sg-extra"
        );
    }

    #[tokio::test]
    async fn list_drops_empty_items() {
        let cloud = fake_cloud();
        let evaluator = ParameterEvaluator::new(&cloud);
        let token = CancellationToken::new();
        let value = ParameterValue::List {
            items: vec![
                ParameterValue::Literal {
                    value: String::new(),
                },
                ParameterValue::Literal {
                    value: "kept".to_string(),
                },
            ],
        };
        assert_eq!(
            evaluator.evaluate(&token, &value, "us-east-1").await.unwrap(),
            "kept"
        );
    }

    #[tokio::test]
    async fn nested_list_is_flattened_by_join() {
        let cloud = fake_cloud();
        let evaluator = ParameterEvaluator::new(&cloud);
        let token = CancellationToken::new();
        let value = ParameterValue::List {
            items: vec![
                ParameterValue::Literal {
                    value: "a".to_string(),
                },
                ParameterValue::List {
                    items: vec![
                        ParameterValue::Literal {
                            value: "b".to_string(),
                        },
                        ParameterValue::Literal {
                            value: "c".to_string(),
                        },
                    ],
                },
            ],
        };
        assert_eq!(
            evaluator.evaluate(&token, &value, "us-east-1").await.unwrap(),
            "a,b,c"
        );
    }
}
