use crate::contract::{AuthorizationKind, TypeMetadataProvider};
use crate::error::Result;
use crate::model::{ContractModel, GeneratorSettings, OPENAPI_VERSION};
use crate::operation::{HttpMethod, OperationDescriptor, ParamPlace, ParameterDescriptor};
use crate::schema_generator::{Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_CONTENT: &str = "application/json";
/// Security scheme name for HTTP basic authentication
pub const BASIC_SCHEME: &str = "http_basic";
/// Security scheme name for bearer tokens
pub const BEARER_SCHEME: &str = "Bearer";
const BEARER_DESCRIPTION: &str = "JWT Authorization header using the Bearer scheme. \r\n\r\n Enter your JWT token in the text input below.";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    openapi: String,
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
    /// Union of the authorization flags of every added operation
    authorization: AuthorizationKind,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// DELETE operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// OPTIONS operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    /// Operation registered for a method.
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }
}

/// A security requirement: scheme name to scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Parameters (path, query, header)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, Schema>>,
    #[serde(rename = "securitySchemes", skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<IndexMap<String, SecurityScheme>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: "Contract API".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                license: None,
            },
            servers: Vec::new(),
            paths: IndexMap::new(),
            authorization: AuthorizationKind::NONE,
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info.title = title;
        self.info.version = version;
        self.info.description = description;
        self
    }

    /// Set the license. Ignored unless both name and url are non-empty.
    pub fn with_license(mut self, name: Option<&str>, url: Option<&str>) -> Self {
        self.info.license = match (name, url) {
            (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => Some(License {
                name: name.to_string(),
                url: url.to_string(),
            }),
            _ => None,
        };
        self
    }

    pub fn with_server(mut self, url: impl Into<String>) -> Self {
        self.servers.push(Server { url: url.into() });
        self
    }

    pub fn with_openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi = version.into();
        self
    }

    /// Add an operation to the OpenAPI document.
    ///
    /// OPTIONS operations and wildcard templates are not documented. When two
    /// operations share a path and method the first one added wins and the
    /// later one is dropped with a warning.
    pub fn add_operation(
        &mut self,
        operation: &OperationDescriptor,
        schema_gen: &mut SchemaGenerator<'_>,
    ) -> Result<()> {
        self.authorization |= operation.authorization;

        if operation.method == HttpMethod::Options || operation.uri_template.contains('*') {
            debug!("Skipping operation {}", operation.name);
            return Ok(());
        }

        let template_path = operation
            .uri_template
            .split('?')
            .next()
            .unwrap_or_default();
        let openapi_path = format!("/{}", template_path.trim_start_matches('/'));
        debug!(
            "Adding operation: {} {}",
            operation.method, openapi_path
        );

        let mut parameters = Vec::new();
        for parameter in operation.parameters.iter().filter(|p| p.place != ParamPlace::Body) {
            parameters.push(Parameter {
                name: parameter.name.clone(),
                location: parameter.place.location()?.to_string(),
                description: non_empty(parameter.summary.as_deref()),
                required: parameter.place == ParamPlace::Path || parameter.is_required,
                schema: Self::parameter_schema(parameter, schema_gen)?,
            });
        }

        let body: Vec<&ParameterDescriptor> = operation.body_parameters().collect();
        let request_body = if body.is_empty() {
            None
        } else {
            Some(Self::request_body(operation, &body, schema_gen)?)
        };

        let mut responses = IndexMap::new();
        responses.insert(
            operation.success_response.code.to_string(),
            Self::success_response(operation, schema_gen)?,
        );
        for error in &operation.error_responses {
            let content = match error.example.as_deref().filter(|e| !e.is_empty()) {
                Some(example) => {
                    let schema = match &error.parameter {
                        Some(parameter) => Some(Self::parameter_schema(parameter, schema_gen)?),
                        None => None,
                    };
                    Some(json_content(schema, Some(example)))
                }
                None => None,
            };
            responses.insert(
                error.code.to_string(),
                Response {
                    description: error.description.clone(),
                    content,
                },
            );
        }

        let result = Operation {
            tags: first_segment(&openapi_path).into_iter().collect(),
            summary: non_empty(Some(&operation.summary)),
            description: non_empty(Some(&operation.description)),
            operation_id: Some(operation.name.clone()),
            parameters: (!parameters.is_empty()).then_some(parameters),
            request_body,
            responses,
            security: security_requirements(operation.authorization),
        };

        let slot = self.paths.entry(openapi_path.clone()).or_default().slot(operation.method);
        if slot.is_some() {
            warn!(
                "Operation {} {} is declared twice, keeping the first",
                operation.method, openapi_path
            );
        } else {
            *slot = Some(result);
        }
        Ok(())
    }

    fn parameter_schema(
        parameter: &ParameterDescriptor,
        schema_gen: &mut SchemaGenerator<'_>,
    ) -> Result<Schema> {
        let descriptor = parameter.descriptor();
        schema_gen.resolve(&parameter.type_name, descriptor.as_deref())
    }

    /// A single bare body parameter is the body itself; several parameters or
    /// a wrapped request form an object keyed by parameter name.
    fn request_body(
        operation: &OperationDescriptor,
        body: &[&ParameterDescriptor],
        schema_gen: &mut SchemaGenerator<'_>,
    ) -> Result<RequestBody> {
        let example = operation.request_sample.as_deref();
        if let [single] = body {
            if !operation.body_style.is_request_wrapped() {
                let schema = Self::parameter_schema(single, schema_gen)?;
                return Ok(RequestBody {
                    description: non_empty(single.summary.as_deref()),
                    required: single.is_required,
                    content: json_content(Some(schema), example),
                });
            }
        }

        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for parameter in body {
            properties.insert(
                parameter.name.clone(),
                Self::parameter_schema(parameter, schema_gen)?,
            );
            if parameter.is_required {
                required.push(parameter.name.clone());
            }
        }
        let schema = Schema {
            properties: Some(properties),
            required: (!required.is_empty()).then(|| required.clone()),
            ..Schema::typed("object")
        };
        Ok(RequestBody {
            description: None,
            required: !required.is_empty(),
            content: json_content(Some(schema), example),
        })
    }

    fn success_response(
        operation: &OperationDescriptor,
        schema_gen: &mut SchemaGenerator<'_>,
    ) -> Result<Response> {
        let success = &operation.success_response;
        let content = match &operation.output {
            Some(output) if !output.type_name.is_void() => {
                let schema = Self::parameter_schema(output, schema_gen)?;
                Some(json_content(Some(schema), success.example.as_deref()))
            }
            _ => None,
        };
        Ok(Response {
            description: success.description.clone(),
            content,
        })
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: SchemaGenerator<'_>) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let schemas = schema_gen.into_references();
        let mut security_schemes = IndexMap::new();
        if self.authorization.contains(AuthorizationKind::BASIC) {
            security_schemes.insert(
                BASIC_SCHEME.to_string(),
                SecurityScheme {
                    scheme_type: "http".to_string(),
                    scheme: "basic".to_string(),
                    description: None,
                },
            );
        }
        if self.authorization.contains(AuthorizationKind::BEARER) {
            security_schemes.insert(
                BEARER_SCHEME.to_string(),
                SecurityScheme {
                    scheme_type: "http".to_string(),
                    scheme: "bearer".to_string(),
                    description: Some(BEARER_DESCRIPTION.to_string()),
                },
            );
        }

        let components = if schemas.is_empty() && security_schemes.is_empty() {
            None
        } else {
            Some(Components {
                schemas: (!schemas.is_empty()).then_some(schemas),
                security_schemes: (!security_schemes.is_empty()).then_some(security_schemes),
            })
        };

        OpenApiDocument {
            openapi: self.openapi,
            info: self.info,
            servers: self.servers,
            paths: self.paths,
            components,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the OpenAPI document of a contract model.
///
/// Operations are added in URI template order.
pub fn generate_document(
    model: &ContractModel,
    provider: &dyn TypeMetadataProvider,
    settings: &GeneratorSettings,
) -> Result<OpenApiDocument> {
    let api_info = model.api_info.clone().unwrap_or_default();
    let title = settings
        .title
        .clone()
        .or_else(|| non_empty(Some(&model.summary)))
        .unwrap_or_else(|| model.name.clone());
    let version = api_info
        .api_version
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    let mut builder = OpenApiBuilder::new()
        .with_openapi_version(settings.openapi_version.clone())
        .with_info(title, version, None)
        .with_license(
            api_info.license_title.as_deref(),
            api_info.license_url.as_deref(),
        );
    if let Some(url) = &settings.server_url {
        builder = builder.with_server(url.clone());
    }

    let mut operations: Vec<&OperationDescriptor> = model.operations.iter().collect();
    operations.sort_by(|a, b| a.uri_template.cmp(&b.uri_template));

    let mut schema_gen = SchemaGenerator::new(provider);
    for operation in operations {
        builder.add_operation(operation, &mut schema_gen)?;
    }
    Ok(builder.build(schema_gen))
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// First non-empty path segment, used as the operation tag.
fn first_segment(path: &str) -> Option<String> {
    path.split('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn security_requirements(kind: AuthorizationKind) -> Option<Vec<SecurityRequirement>> {
    if kind.is_empty() {
        return None;
    }
    let mut requirements = Vec::new();
    for (flag, scheme) in [
        (AuthorizationKind::BASIC, BASIC_SCHEME),
        (AuthorizationKind::BEARER, BEARER_SCHEME),
    ] {
        if kind.contains(flag) {
            let mut requirement = SecurityRequirement::new();
            requirement.insert(scheme.to_string(), Vec::new());
            requirements.push(requirement);
        }
    }
    Some(requirements)
}

/// Sample text as an example value; text that is not JSON is kept as a string.
fn example_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn json_content(schema: Option<Schema>, example: Option<&str>) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(
        JSON_CONTENT.to_string(),
        MediaType {
            schema,
            example: example.filter(|e| !e.is_empty()).map(example_value),
        },
    );
    content
}
