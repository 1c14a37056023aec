//! The stack resolver (§4.3): orchestrates config, template, and parameter resolution.

use std::collections::BTreeMap;

use crate::{
    cancel::CancellationToken,
    dependency::DependencyResolver,
    error::Error,
    model::Stack,
    parameter::ParameterEvaluator,
    ports::{CloudOperations, ConfigStore, TemplateSource},
};

/// The output of resolving several stacks together: the resolved stacks plus the deploy order
/// they were resolved in (§4.3).
pub struct ResolvedStacks {
    pub stacks: Vec<Stack>,
    pub order: Vec<String>,
}

/// Resolves declarative `StackConfig`s into fully-evaluated `Stack`s.
pub struct StackResolver<'a> {
    config: &'a dyn ConfigStore,
    template_source: &'a dyn TemplateSource,
    cloud: &'a dyn CloudOperations,
}

impl<'a> StackResolver<'a> {
    #[must_use]
    pub fn new(
        config: &'a dyn ConfigStore,
        template_source: &'a dyn TemplateSource,
        cloud: &'a dyn CloudOperations,
    ) -> Self {
        Self {
            config,
            template_source,
            cloud,
        }
    }

    /// Resolves a single stack: §4.3's "load context-level config; look up the `StackConfig`;
    /// fetch template body; evaluate parameters; merge tags; carry capabilities and dependencies
    /// through unchanged."
    #[tracing::instrument(skip(self, token), fields(%context, %stack_name))]
    pub async fn resolve(
        &self,
        token: &CancellationToken,
        context: &str,
        stack_name: &str,
    ) -> Result<Stack, Error> {
        let ctx = self
            .config
            .load_context(context)
            .await
            .map_err(|source| crate::error::config("failed to load config", source))?;

        let stack_config = self
            .config
            .get_stack(stack_name, context)
            .await
            .map_err(|source| crate::error::config("failed to get stack", source))?;

        let template_body = self
            .template_source
            .resolve(&stack_config.template_locator)
            .await
            .map_err(|source| crate::error::template_source("failed to read template", source))?;

        let evaluator = ParameterEvaluator::new(self.cloud);
        let parameters = evaluator
            .evaluate_all(token, &stack_config.parameters, &ctx.region)
            .await
            .map_err(|error| Error::Resolution(format!("failed to resolve parameters: {error}")))?;

        let tags = merge_tags(&ctx.tags, &stack_config.tags);

        tracing::debug!(parameters = parameters.len(), tags = tags.len(), "stack resolved");

        Ok(Stack {
            name: stack_config.name,
            context: ctx,
            template_body,
            parameters,
            tags,
            capabilities: stack_config.capabilities,
            dependencies: stack_config.dependencies,
        })
    }

    /// Resolves a set of stacks in dependency order (§4.3, §4.6 batch rule): order is computed
    /// once, then each stack is resolved in turn so later stacks observe earlier ones' outputs.
    pub async fn resolve_many(
        &self,
        token: &CancellationToken,
        context: &str,
        names: &[String],
    ) -> Result<ResolvedStacks, Error> {
        let order = DependencyResolver::new(self.config)
            .order(context, names)
            .await?;

        let mut stacks = Vec::with_capacity(order.len());
        for name in &order {
            crate::cancel::check(token, "resolve batch")?;
            stacks.push(self.resolve(token, context, name).await?);
        }

        Ok(ResolvedStacks { stacks, order })
    }
}

/// Merges tags with "later writers win": `project.tags ⊕ context.tags ⊕ stack.tags` (§4.3).
/// The project layer is folded into `context.tags` by the Config Store Port before this crate
/// sees it (`Context.tags` is already project⊕context, per §3's Context definition), so here we
/// only need to layer the stack's own tags on top.
fn merge_tags(
    context_tags: &BTreeMap<String, String>,
    stack_tags: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = context_tags.clone();
    merged.extend(stack_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
