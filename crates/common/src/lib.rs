//! Common types and utilities for aws-serverless
//!
//! This crate contains the pieces shared by the API Gateway and event
//! subscription crates: the error type, asynchronous [`Output`] values, the
//! resource graph contract, the evaluation [`Program`] and the lambda handler
//! adapter.
//!
//! ## Evaluation model
//!
//! A program declares resources against a [`ResourceGraph`]. Attributes that
//! only exist once the engine has created a resource (ARNs, generated names,
//! invoke URLs) are exposed as [`Output`] values, which can be projected with
//! [`Output::apply`] and joined with [`Output::all`] before anything is
//! serialized.

mod config;
pub mod function;
mod graph;
mod memory;
mod naming;
mod output;
mod program;
pub mod resources;

pub use config::ProgramConfig;
pub use function::{create_lambda_function, FunctionArgs, FunctionCode, Handler};
pub use graph::{Attributes, IntoInput, Resource, ResourceGraph, ResourceOptions, ResourceSpec, Urn};
pub use memory::{DeclaredResource, InMemoryGraph};
pub use naming::{derived_name, safe_bucket_name, short_hash};
pub use output::{output_from_map, Output, OutputError, Resolver};
pub use program::{ExitHook, Program};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while declaring serverless resources
#[derive(Error, Debug)]
pub enum ServerlessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Method not supported: {0}")]
    UnsupportedMethod(String),

    #[error("Failed to read static asset {}: {source}", .path.display())]
    StaticAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not yet implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Output resolution failed: {0}")]
    Resolution(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for resource declarations
pub type Result<T> = std::result::Result<T, ServerlessError>;
