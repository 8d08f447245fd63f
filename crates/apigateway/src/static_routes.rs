//! Static content served through S3
//!
//! Every static route's files are uploaded to one bucket per API. A file route
//! becomes a single GET operation; a directory route becomes an optional index
//! operation plus a greedy `{proxy+}` operation reading any object under the
//! directory's key prefix.

use crate::types::{
    Integration, IntegrationResponse, IntegrationType, Method, OrderedMap, StaticRoute,
    SwaggerHeader, SwaggerOperation, SwaggerParameter, SwaggerResponse, SwaggerSchema,
    SwaggerSpec, ANY_METHOD,
};
use aws_serverless_common::resources::{types, Bucket};
use aws_serverless_common::{
    derived_name, safe_bucket_name, Output, Program, Resource, ResourceOptions, ResourceSpec,
    Result, ServerlessError,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Policy granting the API's roles read access to the bucket
pub const AMAZON_S3_READ_ONLY_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess";

/// Trust policy letting API Gateway assume a role
pub fn apigateway_assume_role_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "",
            "Effect": "Allow",
            "Principal": { "Service": "apigateway.amazonaws.com" },
            "Action": "sts:AssumeRole",
        }],
    })
}

/// Upload static routes and add their operations to `spec`
///
/// No bucket is created when there are no static routes. A missing local path
/// is fatal.
pub fn add_static_routes(
    program: &Program<'_>,
    api_name: &str,
    static_routes: &[StaticRoute],
    mut spec: SwaggerSpec,
    options: &ResourceOptions,
) -> Result<SwaggerSpec> {
    if static_routes.is_empty() {
        return Ok(spec);
    }

    let bucket = Bucket::declare(program, &safe_bucket_name(api_name), options.clone())?;
    let publisher = StaticPublisher {
        program,
        api_name,
        bucket,
        options,
    };

    for route in static_routes {
        let metadata = fs::metadata(&route.local_path).map_err(|source| {
            ServerlessError::StaticAsset {
                path: route.local_path.clone(),
                source,
            }
        })?;

        if metadata.is_file() {
            publisher.publish_file(route, &mut spec)?;
        } else if metadata.is_dir() {
            publisher.publish_directory(route, &mut spec)?;
        } else {
            return Err(ServerlessError::Config(format!(
                "Static route {} is neither a file nor a directory: {}",
                route.path,
                route.local_path.display()
            )));
        }
    }

    Ok(spec)
}

struct StaticPublisher<'a, 'g> {
    program: &'a Program<'g>,
    api_name: &'a str,
    bucket: Bucket,
    options: &'a ResourceOptions,
}

impl StaticPublisher<'_, '_> {
    fn publish_file(&self, route: &StaticRoute, spec: &mut SwaggerSpec) -> Result<()> {
        let method = Method::Get.swagger_token();
        let key = derived_name(self.api_name, &format!("{}:{}", method, route.path));
        let role = self.create_role(&key)?;

        self.create_bucket_object(&key, &route.local_path, route.content_type.as_deref())?;
        info!(path = %route.path, file = %route.local_path.display(), "published static file");

        spec.paths
            .entry_or_default(&route.path)
            .insert(method, self.create_path_spec_object(&key, &role, None));
        Ok(())
    }

    fn publish_directory(&self, route: &StaticRoute, spec: &mut SwaggerSpec) -> Result<()> {
        let server_path = if route.path.ends_with('/') {
            route.path.clone()
        } else {
            format!("{}/", route.path)
        };

        let method = Method::Get.swagger_token();
        let directory_key = derived_name(self.api_name, &format!("{}:{}", method, server_path));
        let role = self.create_role(&directory_key)?;
        let index_file = route.index.file_name();

        let mut uploaded = 0;
        for entry in WalkDir::new(&route.local_path)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| route.local_path.clone());
                ServerlessError::StaticAsset {
                    path,
                    source: e.into(),
                }
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_key(&route.local_path, entry.path())?;
            let file_key = format!("{}/{}", directory_key, relative);
            self.create_bucket_object(&file_key, entry.path(), None)?;
            uploaded += 1;

            if index_file == Some(relative.as_str()) {
                spec.paths
                    .entry_or_default(&server_path)
                    .insert(method, self.create_path_spec_object(&file_key, &role, None));
            }
        }

        info!(
            path = %server_path,
            directory = %route.local_path.display(),
            files = uploaded,
            "published static directory"
        );

        spec.paths
            .entry_or_default(&format!("{}{{proxy+}}", server_path))
            .insert(
                ANY_METHOD,
                self.create_path_spec_object(&directory_key, &role, Some("proxy")),
            );
        Ok(())
    }

    /// Role API Gateway assumes to read objects under `key`
    ///
    /// Suffixed so it never shares a name with the execution role of a lambda
    /// route registered for the same path.
    fn create_role(&self, key: &str) -> Result<Resource> {
        let name = format!("{}-s3", key);
        let role = self.program.declare(
            ResourceSpec::new(types::ROLE, &name)
                .input("assumeRolePolicy", apigateway_assume_role_policy().to_string())
                .options(self.options.clone()),
        )?;

        self.program.declare(
            ResourceSpec::new(types::ROLE_POLICY_ATTACHMENT, &name)
                .input("role", role.name_output())
                .input("policyArn", AMAZON_S3_READ_ONLY_ACCESS)
                .options(self.options.clone()),
        )?;

        Ok(role)
    }

    fn create_bucket_object(
        &self,
        key: &str,
        source: &Path,
        content_type: Option<&str>,
    ) -> Result<Resource> {
        let content_type = content_type
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(source).first_raw().map(str::to_string));

        debug!(key, content_type = ?content_type, "uploading object");
        self.program.declare(
            ResourceSpec::new(types::BUCKET_OBJECT, key)
                .input("bucket", self.bucket.bucket_name())
                .input("key", key)
                .input("source", source.display().to_string())
                .optional_input("contentType", content_type)
                .options(self.options.clone()),
        )
    }

    fn create_path_spec_object(
        &self,
        key: &str,
        role: &Resource,
        path_parameter: Option<&str>,
    ) -> SwaggerOperation {
        let region = self.program.region().to_string();
        let object_path = match path_parameter {
            Some(parameter) => format!("{}/{{{}}}", key, parameter),
            None => key.to_string(),
        };
        let uri: Output<String> = self.bucket.bucket_name().apply(move |bucket| {
            format!("arn:aws:apigateway:{}:s3:path/{}/{}", region, bucket, object_path)
        });

        let (parameters, request_parameters) = match path_parameter {
            Some(parameter) => (
                Some(vec![SwaggerParameter {
                    name: parameter.to_string(),
                    location: "path".to_string(),
                    required: true,
                    param_type: "string".to_string(),
                }]),
                Some(
                    [(
                        format!("integration.request.path.{}", parameter),
                        format!("method.request.path.{}", parameter),
                    )]
                    .into_iter()
                    .collect(),
                ),
            ),
            None => (None, None),
        };

        SwaggerOperation {
            parameters,
            responses: Some(object_responses()),
            integration: Integration {
                request_parameters,
                passthrough_behavior: Some("when_no_match".to_string()),
                http_method: "GET".to_string(),
                integration_type: IntegrationType::Aws,
                responses: Some(object_integration_responses()),
                connection_type: None,
                uri,
                credentials: Some(role.arn()),
                connection_id: None,
            },
            lambda: None,
        }
    }
}

fn described(status: &str) -> SwaggerResponse {
    SwaggerResponse {
        description: format!("{} response", status),
        schema: None,
        headers: None,
    }
}

fn object_responses() -> OrderedMap<SwaggerResponse> {
    let string_header = || SwaggerHeader {
        header_type: "string".to_string(),
    };
    let ok = SwaggerResponse {
        schema: Some(SwaggerSchema {
            schema_type: "object".to_string(),
        }),
        headers: Some(
            [
                ("Content-Type", string_header()),
                ("content-type", string_header()),
            ]
            .into_iter()
            .collect(),
        ),
        ..described("200")
    };

    [("200", ok), ("400", described("400")), ("500", described("500"))]
        .into_iter()
        .collect()
}

fn object_integration_responses() -> OrderedMap<IntegrationResponse> {
    let status = |code: &str| IntegrationResponse {
        status_code: code.to_string(),
        response_parameters: None,
    };
    let default = IntegrationResponse {
        status_code: "200".to_string(),
        response_parameters: Some(
            [
                (
                    "method.response.header.Content-Type",
                    "integration.response.header.Content-Type".to_string(),
                ),
                (
                    "method.response.header.content-type",
                    "integration.response.header.content-type".to_string(),
                ),
            ]
            .into_iter()
            .collect(),
        ),
    };

    [
        ("4\\d{2}", status("400")),
        ("default", default),
        ("5\\d{2}", status("500")),
    ]
    .into_iter()
    .collect()
}

/// Object key suffix of a file below `root`, always '/'-separated
fn relative_key(root: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(root).map_err(|_| {
        ServerlessError::Config(format!(
            "{} is not inside {}",
            file.display(),
            root.display()
        ))
    })?;

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = PathBuf::from("www");
        let file = root.join("css").join("site.css");
        assert_eq!(relative_key(&root, &file).unwrap(), "css/site.css");
    }

    #[test]
    fn test_integration_response_order() {
        let responses = object_integration_responses();
        let keys: Vec<&str> = responses.keys().collect();
        assert_eq!(keys, vec!["4\\d{2}", "default", "5\\d{2}"]);
    }

    #[test]
    fn test_ok_response_declares_content_type_headers() {
        let responses = serde_json::to_value(object_responses()).unwrap();
        assert_eq!(responses["200"]["schema"]["type"], "object");
        assert_eq!(responses["200"]["headers"]["content-type"]["type"], "string");
        assert_eq!(responses["400"], json!({"description": "400 response"}));
    }
}
