//! CodeCommit repository triggers

use crate::subscription::{subscribe, EventSource, EventSubscription};
use aws_serverless_common::resources::{types, LambdaFunction, Repository};
use aws_serverless_common::{
    Handler, Output, Program, Resource, ResourceOptions, ResourceSpec, Result, ServerlessError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// CodeCommit rejects triggers naming more branches than this
pub const MAX_TRIGGER_BRANCHES: usize = 10;

/// Repository events a trigger can fire on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepositoryEventType {
    All,
    CreateReference,
    DeleteReference,
    UpdateReference,
}

impl RepositoryEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryEventType::All => "all",
            RepositoryEventType::CreateReference => "createReference",
            RepositoryEventType::DeleteReference => "deleteReference",
            RepositoryEventType::UpdateReference => "updateReference",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySubscriptionArgs {
    pub events: Vec<RepositoryEventType>,
    /// Branches the trigger is limited to; every branch when empty
    #[serde(default)]
    pub branches: Vec<String>,
}

impl RepositorySubscriptionArgs {
    pub fn new(events: &[RepositoryEventType], branches: Vec<String>) -> Self {
        Self {
            events: events.to_vec(),
            branches,
        }
    }
}

impl EventSource for Repository {
    type Args = RepositorySubscriptionArgs;

    const COMPONENT_TYPE: &'static str = "aws-serverless:codecommit:RepositoryEventSubscription";
    const FUNCTION_SUFFIX: &'static str = "-repository-event";

    fn principal(&self, _program: &Program<'_>) -> String {
        "codecommit.amazonaws.com".to_string()
    }

    fn source_arn(&self) -> Output<String> {
        self.arn()
    }

    fn validate(name: &str, args: &RepositorySubscriptionArgs) -> Result<()> {
        if args.events.is_empty() {
            return Err(ServerlessError::Config(format!(
                "Repository subscription {} must list at least one event",
                name
            )));
        }
        if args.branches.len() > MAX_TRIGGER_BRANCHES {
            return Err(ServerlessError::Config(format!(
                "Repository subscription {} names {} branches; at most {} are allowed",
                name,
                args.branches.len(),
                MAX_TRIGGER_BRANCHES
            )));
        }
        Ok(())
    }

    fn create_trigger(
        &self,
        program: &Program<'_>,
        name: &str,
        func: &LambdaFunction,
        args: &RepositorySubscriptionArgs,
        options: ResourceOptions,
    ) -> Result<Resource> {
        let trigger_name = name.to_string();
        let events: Vec<&str> = args.events.iter().map(|e| e.as_str()).collect();
        let branches = args.branches.clone();
        let triggers = func.arn().apply(move |arn| {
            json!([{
                "name": trigger_name,
                "events": events,
                "branches": branches,
                "destinationArn": arn,
            }])
        });

        program.declare(
            ResourceSpec::new(types::REPOSITORY_TRIGGER, name)
                .input("repositoryName", self.name_output())
                .input("triggers", triggers)
                .options(options),
        )
    }
}

fn subscribe_to(
    program: &Program<'_>,
    name: &str,
    repository: &Repository,
    handler: impl Into<Handler>,
    event: RepositoryEventType,
    branches: Vec<String>,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    subscribe(
        program,
        name,
        repository,
        handler,
        RepositorySubscriptionArgs::new(&[event], branches),
        options,
    )
}

/// Invoke a handler for every repository event
pub fn on_any_event(
    program: &Program<'_>,
    name: &str,
    repository: &Repository,
    handler: impl Into<Handler>,
    branches: Vec<String>,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    subscribe_to(program, name, repository, handler, RepositoryEventType::All, branches, options)
}

pub fn on_branch_or_tag_created(
    program: &Program<'_>,
    name: &str,
    repository: &Repository,
    handler: impl Into<Handler>,
    branches: Vec<String>,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    subscribe_to(
        program,
        name,
        repository,
        handler,
        RepositoryEventType::CreateReference,
        branches,
        options,
    )
}

pub fn on_branch_or_tag_deleted(
    program: &Program<'_>,
    name: &str,
    repository: &Repository,
    handler: impl Into<Handler>,
    branches: Vec<String>,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    subscribe_to(
        program,
        name,
        repository,
        handler,
        RepositoryEventType::DeleteReference,
        branches,
        options,
    )
}

/// Invoke a handler when commits are pushed to a branch that already exists
pub fn on_existing_branch_pushed(
    program: &Program<'_>,
    name: &str,
    repository: &Repository,
    handler: impl Into<Handler>,
    branches: Vec<String>,
    options: ResourceOptions,
) -> Result<EventSubscription> {
    subscribe_to(
        program,
        name,
        repository,
        handler,
        RepositoryEventType::UpdateReference,
        branches,
        options,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let parsed: Vec<RepositoryEventType> =
            serde_json::from_str(r#"["all", "updateReference"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![RepositoryEventType::All, RepositoryEventType::UpdateReference]
        );
        assert_eq!(RepositoryEventType::CreateReference.as_str(), "createReference");
    }

    #[test]
    fn test_too_many_branches() {
        let branches = (0..11).map(|i| format!("feature-{}", i)).collect();
        let args = RepositorySubscriptionArgs::new(&[RepositoryEventType::All], branches);
        let err = Repository::validate("ci", &args).unwrap_err();
        assert!(err.to_string().contains("at most 10"));
    }
}
