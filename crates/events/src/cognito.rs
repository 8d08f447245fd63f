//! Cognito user pool triggers
//!
//! Not supported yet: every entry point fails with
//! [`ServerlessError::NotImplemented`].

use crate::subscription::EventSubscription;
use aws_serverless_common::resources::UserPool;
use aws_serverless_common::{Handler, Program, ResourceOptions, Result, ServerlessError};
use serde::{Deserialize, Serialize};

/// Lambda hooks a user pool can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserPoolTrigger {
    PreSignUp,
    PostConfirmation,
    PreAuthentication,
    PostAuthentication,
    CreateAuthChallenge,
    DefineAuthChallenge,
    VerifyAuthChallengeResponse,
    PreTokenGeneration,
    UserMigration,
    CustomMessage,
}

/// Invoke a handler from one of a user pool's triggers
pub fn on_trigger(
    _program: &Program<'_>,
    _name: &str,
    _user_pool: &UserPool,
    _trigger: UserPoolTrigger,
    _handler: impl Into<Handler>,
    _options: ResourceOptions,
) -> Result<EventSubscription> {
    Err(ServerlessError::NotImplemented("Cognito user pool triggers"))
}
