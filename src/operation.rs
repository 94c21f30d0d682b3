//! Operation model builder.
//!
//! Assembles the documentation model of one operation from its binding
//! declarations, parameter metadata, doc comments and fault declarations.

use crate::contract::{
    AuthorizationKind, BodyStyle, ContractDescription, ExampleKind, OperationContract, TypeName,
};
use crate::doc_comments::method_key;
use crate::error::{Error, Result};
use crate::responses::{merge_error_responses, ResponseDescriptor};
use crate::samples::{parameter_value, render_payload};
use crate::type_descriptor::{DescriptorRef, TypeDescriptor, TypeDescriptorBuilder};
use log::debug;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Status code of the success response
pub const SUCCESS_CODE: u16 = 200;
/// Success description used when the return value is undocumented
pub const SUCCESS_DESCRIPTION: &str = "Successful operation";

static TEMPLATE_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\*?([^{}]+)\}").expect("valid regex"));

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            _ => Err(Error::unsupported("method", s)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter travels in the HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamPlace {
    Path,
    Query,
    Header,
    Body,
}

impl ParamPlace {
    /// OpenAPI `in` value. The body has none.
    pub fn location(self) -> Result<&'static str> {
        match self {
            ParamPlace::Path => Ok("path"),
            ParamPlace::Query => Ok("query"),
            ParamPlace::Header => Ok("header"),
            ParamPlace::Body => Err(Error::unsupported("parameter placement", "body")),
        }
    }
}

/// Variables of a URI template such as `orders/{id}?expand={expand}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    path_variables: Vec<String>,
    query_variables: Vec<String>,
}

impl UriTemplate {
    pub fn parse(raw: &str) -> Self {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None => (raw, ""),
        };
        let variables = |part: &str| -> Vec<String> {
            TEMPLATE_VARIABLE
                .captures_iter(part)
                .map(|c| c[1].trim().to_uppercase())
                .collect()
        };
        Self {
            raw: raw.to_string(),
            path_variables: variables(path),
            query_variables: variables(query),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Template up to the query string.
    pub fn path(&self) -> &str {
        self.raw.split('?').next().unwrap_or_default()
    }

    /// Placement of a parameter by case-insensitive variable name; a query
    /// match wins over a path match.
    pub fn placement(&self, name: &str) -> Option<ParamPlace> {
        let name = name.to_uppercase();
        if self.query_variables.contains(&name) {
            Some(ParamPlace::Query)
        } else if self.path_variables.contains(&name) {
            Some(ParamPlace::Path)
        } else {
            None
        }
    }
}

/// A parameter, return value or fault payload of an operation.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Empty for return values and fault payloads
    pub name: String,
    pub type_name: TypeName,
    pub summary: Option<String>,
    pub place: ParamPlace,
    pub is_required: bool,
    /// Example kind override for samples
    pub example_kind: Option<ExampleKind>,
    /// Headers have no type descriptor
    pub type_descriptor: Option<DescriptorRef>,
}

impl ParameterDescriptor {
    /// An unnamed payload such as a return value or fault detail.
    pub fn payload(
        type_name: TypeName,
        descriptor: Option<&Arc<TypeDescriptor>>,
        is_required: bool,
    ) -> Self {
        Self {
            name: String::new(),
            type_name,
            summary: None,
            place: ParamPlace::Body,
            is_required,
            example_kind: None,
            type_descriptor: descriptor.map(DescriptorRef::new),
        }
    }

    pub fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        self.type_descriptor.as_ref().and_then(DescriptorRef::get)
    }
}

/// Documentation model of one operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub method: HttpMethod,
    pub uri_template: String,
    pub description: String,
    /// Doc-comment summary
    pub summary: String,
    pub body_style: BodyStyle,
    /// Header parameters first, then the formal parameters in order
    pub parameters: Vec<ParameterDescriptor>,
    pub output: Option<ParameterDescriptor>,
    pub fault_output: Option<ParameterDescriptor>,
    pub authorization: AuthorizationKind,
    pub success_response: ResponseDescriptor,
    pub error_responses: Vec<ResponseDescriptor>,
    pub request_sample: Option<String>,
    pub response_sample: Option<String>,
    pub error_sample: Option<String>,
}

impl OperationDescriptor {
    pub fn body_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.place == ParamPlace::Body)
    }
}

/// HTTP method of an operation: the invoke binding's method (blank means
/// POST), else GET for a get binding, else POST.
pub fn resolve_method(operation: &OperationContract) -> Result<HttpMethod> {
    if let Some(invoke) = &operation.invoke {
        return match invoke.method.as_deref().map(str::trim) {
            Some(method) if !method.is_empty() => method.parse(),
            _ => Ok(HttpMethod::Post),
        };
    }
    if operation.get.is_some() {
        return Ok(HttpMethod::Get);
    }
    Ok(HttpMethod::Post)
}

/// URI template of an operation: the explicit template, else a synthesized
/// `Name?a={a}&b={b}` for GET, else the operation name.
pub fn resolve_template(operation: &OperationContract, method: HttpMethod) -> String {
    let explicit = match (&operation.invoke, &operation.get) {
        (Some(invoke), _) => invoke.uri_template.as_deref(),
        (None, Some(get)) => get.uri_template.as_deref(),
        (None, None) => None,
    };
    if let Some(template) = explicit.filter(|t| !t.trim().is_empty()) {
        return template.to_string();
    }

    if method == HttpMethod::Get && !operation.parameters.is_empty() {
        let query = operation
            .parameters
            .iter()
            .map(|p| format!("{0}={{{0}}}", p.name))
            .collect::<Vec<_>>()
            .join("&");
        return format!("{}?{}", operation.name, query);
    }
    operation.name.clone()
}

/// Builds operation descriptors for one contract.
pub struct OperationModelBuilder<'b, 'a> {
    types: &'b mut TypeDescriptorBuilder<'a>,
    contract: &'b ContractDescription,
}

impl<'b, 'a> OperationModelBuilder<'b, 'a> {
    pub fn new(types: &'b mut TypeDescriptorBuilder<'a>, contract: &'b ContractDescription) -> Self {
        Self { types, contract }
    }

    /// Builds one operation. `contract_responses` are the faults declared on
    /// the contract type; they are merged with the operation's own.
    pub fn build(
        &mut self,
        operation: &OperationContract,
        contract_responses: &[ResponseDescriptor],
    ) -> Result<OperationDescriptor> {
        let method = resolve_method(operation)?;
        let uri_template = resolve_template(operation, method);
        debug!("Building operation {} {} {}", operation.name, method, uri_template);

        let docs = self.types.docs();
        let default_required = docs.default_required();
        let param_types: Vec<TypeName> = operation
            .parameters
            .iter()
            .map(|p| p.type_name.clone())
            .collect();
        let doc = docs.lookup(&method_key(
            &self.contract.contract_type,
            &operation.name,
            &param_types,
        ));

        // The bare operation name is not a template; everything goes in the body.
        let template = (uri_template != operation.name).then(|| UriTemplate::parse(&uri_template));

        let mut parameters: Vec<ParameterDescriptor> = operation
            .headers
            .iter()
            .map(|header| ParameterDescriptor {
                name: header.name.clone(),
                type_name: TypeName::string(),
                summary: header.description.clone(),
                place: ParamPlace::Header,
                is_required: header.required,
                example_kind: None,
                type_descriptor: None,
            })
            .collect();

        for parameter in &operation.parameters {
            let param_doc = doc.and_then(|d| d.param(&parameter.name));
            let place = template
                .as_ref()
                .and_then(|t| t.placement(&parameter.name))
                .unwrap_or(ParamPlace::Body);
            let is_required = place == ParamPlace::Path
                || parameter
                    .required
                    .or_else(|| param_doc.and_then(|d| d.required))
                    .unwrap_or(default_required);
            let descriptor = self.types.describe(&parameter.type_name);

            parameters.push(ParameterDescriptor {
                name: parameter.name.clone(),
                type_name: parameter.type_name.clone(),
                summary: param_doc.map(|d| d.description.clone()),
                place,
                is_required,
                example_kind: parameter.example_kind,
                type_descriptor: descriptor.as_ref().map(DescriptorRef::new),
            });
        }

        let output = self.payload(&operation.return_type, default_required).map(|mut output| {
            output.summary = doc.map(|d| d.returns.clone());
            output.example_kind = operation.return_example_kind;
            output
        });
        let fault_output = operation
            .fault_type()
            .and_then(|fault| self.payload(fault, default_required));

        let examples = self.types.examples();
        let request_sample = self.request_sample(&parameters, operation.body_style)?;
        let response_sample = match &output {
            Some(output) => {
                let kind = output.example_kind.unwrap_or(ExampleKind::Output);
                let value = parameter_value(output, kind, examples)?;
                render_payload(value.map(|v| (String::new(), v)).into_iter().collect(), false)?
            }
            None => None,
        };
        let error_sample = match &fault_output {
            Some(fault) => {
                let kind = operation
                    .faults
                    .first()
                    .map(|f| f.example_kind)
                    .unwrap_or(ExampleKind::Output);
                let value = parameter_value(fault, kind, examples)?;
                render_payload(value.map(|v| (String::new(), v)).into_iter().collect(), false)?
            }
            None => None,
        };

        let own_responses = self.types.fault_responses(&operation.faults);
        let error_responses = merge_error_responses(contract_responses, &own_responses);

        let success_response = ResponseDescriptor {
            code: SUCCESS_CODE,
            description: output
                .as_ref()
                .and_then(|o| o.summary.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| SUCCESS_DESCRIPTION.to_string()),
            example: response_sample.clone(),
            type_name: output.as_ref().map(|o| o.type_name.clone()),
            example_kind: ExampleKind::Output,
            disabled: false,
            parameter: output.clone(),
        };

        let summary = doc.map(|d| d.summary.clone()).unwrap_or_default();
        let description = operation
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| summary.clone());

        Ok(OperationDescriptor {
            name: operation.name.clone(),
            method,
            uri_template,
            description,
            summary,
            body_style: operation.body_style,
            parameters,
            output,
            fault_output,
            authorization: operation
                .authorization
                .or(self.contract.authorization)
                .unwrap_or(AuthorizationKind::NONE),
            success_response,
            error_responses,
            request_sample,
            response_sample,
            error_sample,
        })
    }

    fn payload(&mut self, type_name: &TypeName, required: bool) -> Option<ParameterDescriptor> {
        let descriptor = self.types.describe(type_name)?;
        Some(ParameterDescriptor::payload(
            type_name.clone(),
            Some(&descriptor),
            required,
        ))
    }

    fn request_sample(
        &self,
        parameters: &[ParameterDescriptor],
        body_style: BodyStyle,
    ) -> Result<Option<String>> {
        let examples = self.types.examples();
        let mut values = Vec::new();
        for parameter in parameters.iter().filter(|p| p.place == ParamPlace::Body) {
            let kind = parameter.example_kind.unwrap_or(ExampleKind::Input);
            if let Some(value) = parameter_value(parameter, kind, examples)? {
                values.push((parameter.name.clone(), value));
            }
        }
        render_payload(values, body_style.is_request_wrapped())
    }
}
