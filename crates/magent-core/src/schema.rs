//! Tool Schemas
//!
//! A tool declares its parameters once through a [`Signature`] (name, JSON
//! type, whether it has a default) and may carry a docstring in the
//! `Args:` / `Returns:` convention:
//!
//! ```text
//! Add two numbers.
//!
//! Args:
//!     a: first operand
//!     b: second operand
//! Returns:
//!     the sum
//! ```
//!
//! [`derive`] combines the two into the [`ToolSchema`] handed to the model.
//! Only parameters that are both declared and documented end up in the
//! schema; requiredness comes from the signature alone.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AgentError, Result};
use crate::tool::Tool;

/// JSON Schema type of a tool parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static mapping from a Rust type to the JSON type the model should send.
///
/// `None` means the type has no direct mapping; such parameters are
/// advertised as strings.
pub trait JsonType {
    fn param_type() -> Option<ParamType>;
}

macro_rules! json_type {
    ($param:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl JsonType for $ty {
                fn param_type() -> Option<ParamType> {
                    Some($param)
                }
            }
        )+
    };
}

json_type!(ParamType::String => String, str, char);
json_type!(ParamType::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
json_type!(ParamType::Number => f32, f64);
json_type!(ParamType::Boolean => bool);
json_type!(ParamType::Object => serde_json::Map<String, serde_json::Value>);

impl JsonType for serde_json::Value {
    fn param_type() -> Option<ParamType> {
        None
    }
}

impl<T: JsonType + ?Sized> JsonType for &T {
    fn param_type() -> Option<ParamType> {
        T::param_type()
    }
}

impl<T: JsonType> JsonType for Option<T> {
    fn param_type() -> Option<ParamType> {
        T::param_type()
    }
}

impl<T> JsonType for Vec<T> {
    fn param_type() -> Option<ParamType> {
        Some(ParamType::Array)
    }
}

impl<T> JsonType for [T] {
    fn param_type() -> Option<ParamType> {
        Some(ParamType::Array)
    }
}

impl<T, S> JsonType for HashSet<T, S> {
    fn param_type() -> Option<ParamType> {
        Some(ParamType::Array)
    }
}

impl<T> JsonType for BTreeSet<T> {
    fn param_type() -> Option<ParamType> {
        Some(ParamType::Array)
    }
}

impl<K, V, S> JsonType for HashMap<K, V, S> {
    fn param_type() -> Option<ParamType> {
        Some(ParamType::Object)
    }
}

impl<K, V> JsonType for BTreeMap<K, V> {
    fn param_type() -> Option<ParamType> {
        Some(ParamType::Object)
    }
}

/// One declared parameter of a tool function
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,

    /// `None` for unannotated parameters
    pub param_type: Option<ParamType>,

    /// Whether the function supplies a value when the model omits it
    pub has_default: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: Option<ParamType>, has_default: bool) -> Self {
        Self {
            name: name.into(),
            param_type,
            has_default,
        }
    }
}

/// Explicit parameter list of a tool function
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter without a default
    #[must_use]
    pub fn required<T: JsonType + ?Sized>(self, name: impl Into<String>) -> Self {
        self.param(Parameter::new(name, T::param_type(), false))
    }

    /// Declare a parameter that has a default
    #[must_use]
    pub fn optional<T: JsonType + ?Sized>(self, name: impl Into<String>) -> Self {
        self.param(Parameter::new(name, T::param_type(), true))
    }

    /// Declare a parameter with no type information and no default
    #[must_use]
    pub fn untyped(self, name: impl Into<String>) -> Self {
        self.param(Parameter::new(name, None, false))
    }

    #[must_use]
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn validate(&self, tool: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.trim().is_empty() {
                return Err(AgentError::SchemaDerivation(format!(
                    "tool `{tool}` declares a parameter with an empty name"
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(AgentError::SchemaDerivation(format!(
                    "tool `{tool}` declares parameter `{}` twice",
                    param.name
                )));
            }
        }
        Ok(())
    }
}

/// A documented parameter as advertised to the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Human-readable description
    pub description: String,
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// First docstring line, or the name when undocumented
    pub description: String,

    /// Documented parameters in docstring order
    pub parameters: Vec<ParameterSchema>,

    /// Names of parameters without a default, in docstring order
    pub required: Vec<String>,
}

impl ToolSchema {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Wire form: `{type: "function", function: {name, description, parameters}}`
    pub fn function_spec(&self) -> FunctionSpec<'_> {
        FunctionSpec {
            kind: "function",
            function: FunctionDefinition {
                name: &self.name,
                description: &self.description,
                parameters: ParametersSpec {
                    kind: "object",
                    properties: PropertiesSpec(&self.parameters),
                    required: &self.required,
                },
            },
        }
    }
}

/// Serializable view of a [`ToolSchema`] in the chat-completions `tools` shape
#[derive(Debug, Serialize)]
pub struct FunctionSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDefinition<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition<'a> {
    name: &'a str,
    description: &'a str,
    parameters: ParametersSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ParametersSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: PropertiesSpec<'a>,
    required: &'a [String],
}

/// Keeps docstring order when written as a JSON object
#[derive(Debug)]
struct PropertiesSpec<'a>(&'a [ParameterSchema]);

#[derive(Serialize)]
struct PropertySpec<'a> {
    #[serde(rename = "type")]
    param_type: ParamType,
    description: &'a str,
}

impl Serialize for PropertiesSpec<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for param in self.0 {
            map.serialize_entry(
                &param.name,
                &PropertySpec {
                    param_type: param.param_type,
                    description: &param.description,
                },
            )?;
        }
        map.end()
    }
}

/// Derive the schema of a registered tool
pub fn derive(tool: &dyn Tool) -> Result<ToolSchema> {
    derive_from_parts(tool.name(), tool.doc(), &tool.signature())
}

/// Derive a schema from a name, an optional docstring and a signature.
///
/// Fails only when the inputs are inconsistent (empty tool name, empty or
/// repeated parameter names). A missing or malformed docstring never fails.
pub fn derive_from_parts(name: &str, doc: Option<&str>, signature: &Signature) -> Result<ToolSchema> {
    if name.trim().is_empty() {
        return Err(AgentError::SchemaDerivation("tool name is empty".into()));
    }
    signature.validate(name)?;

    let lines: Vec<&str> = doc
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let description = lines
        .first()
        .map_or_else(|| name.to_string(), |line| (*line).to_string());

    let mut parameters: Vec<ParameterSchema> = Vec::new();
    let mut required = Vec::new();
    let mut in_args = false;

    for line in &lines {
        if line.starts_with("Args:") {
            in_args = true;
            continue;
        }
        if line.starts_with("Returns:") {
            break;
        }
        if !in_args {
            continue;
        }

        // only the first colon separates name from description
        let Some((param_name, param_desc)) = line.split_once(':') else {
            continue;
        };
        let param_name = param_name.trim();

        let Some(param) = signature.get(param_name) else {
            continue;
        };
        if parameters.iter().any(|p| p.name == param_name) {
            continue;
        }

        parameters.push(ParameterSchema {
            name: param.name.clone(),
            param_type: param.param_type.unwrap_or(ParamType::String),
            description: param_desc.trim().to_string(),
        });
        if !param.has_default {
            required.push(param.name.clone());
        }
    }

    Ok(ToolSchema {
        name: name.to_string(),
        description,
        parameters,
        required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADD_DOC: &str = "Add two numbers.\n\nArgs:\n    a: first\n    b: second\n";

    fn add_signature() -> Signature {
        Signature::new().required::<i64>("a").required::<i64>("b")
    }

    #[test]
    fn test_add_schema() {
        let schema = derive_from_parts("add", Some(ADD_DOC), &add_signature()).unwrap();

        assert_eq!(schema.name, "add");
        assert_eq!(schema.description, "Add two numbers.");
        assert_eq!(schema.parameters.len(), 2);
        assert_eq!(schema.parameter("a").unwrap().param_type, ParamType::Integer);
        assert_eq!(schema.parameter("b").unwrap().description, "second");
        assert_eq!(schema.required, vec!["a", "b"]);
    }

    #[test]
    fn test_defaults_are_never_required() {
        let doc = "Greet someone.\nArgs:\n  name: who to greet (required)\n  loud: shout it (required)";
        let signature = Signature::new().required::<String>("name").optional::<bool>("loud");
        let schema = derive_from_parts("greet", Some(doc), &signature).unwrap();

        assert!(schema.is_required("name"));
        assert!(!schema.is_required("loud"));
        assert_eq!(schema.parameter("loud").unwrap().param_type, ParamType::Boolean);
    }

    #[test]
    fn test_missing_docstring() {
        let schema = derive_from_parts("ping", None, &Signature::new().required::<String>("host")).unwrap();
        assert_eq!(schema.description, "ping");
        assert!(schema.parameters.is_empty());
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_undocumented_and_unknown_parameters() {
        let doc = "Search.\nArgs:\n  query: text to look for\n  ghost: not in the signature\n";
        let signature = Signature::new().required::<String>("query").required::<u32>("limit");
        let schema = derive_from_parts("search", Some(doc), &signature).unwrap();

        assert_eq!(schema.parameters.len(), 1);
        assert!(schema.parameter("limit").is_none());
        assert!(schema.parameter("ghost").is_none());
        assert_eq!(schema.required, vec!["query"]);
    }

    #[test]
    fn test_description_may_contain_colons() {
        let doc = "Fetch.\nArgs:\n  url: target, e.g. https://example.com:8080/path\n";
        let schema = derive_from_parts("fetch", Some(doc), &Signature::new().required::<String>("url")).unwrap();
        assert_eq!(
            schema.parameter("url").unwrap().description,
            "target, e.g. https://example.com:8080/path"
        );
    }

    #[test]
    fn test_malformed_lines_and_returns_section() {
        let doc = "Scale a value.\n\
                   factor: ignored, before Args\n\
                   Args:\n\
                   value: the input\n\
                   this line has no separator\n\
                   factor: multiplier\n\
                   Returns:\n\
                   extra: ignored, after Returns\n";
        let signature = Signature::new()
            .required::<f64>("value")
            .optional::<f64>("factor")
            .required::<String>("extra");
        let schema = derive_from_parts("scale", Some(doc), &signature).unwrap();

        let names: Vec<_> = schema.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["value", "factor"]);
        assert_eq!(schema.parameter("factor").unwrap().description, "multiplier");
        assert_eq!(schema.required, vec!["value"]);
    }

    #[test]
    fn test_type_mapping() {
        let doc = "Types.\nArgs:\n s: s\n i: i\n f: f\n b: b\n l: l\n o: o\n u: u\n v: v\n n: n\n";
        let signature = Signature::new()
            .required::<str>("s")
            .required::<u8>("i")
            .required::<f32>("f")
            .required::<bool>("b")
            .required::<Vec<String>>("l")
            .required::<HashMap<String, i32>>("o")
            .untyped("u")
            .required::<serde_json::Value>("v")
            .optional::<Option<i64>>("n");
        let schema = derive_from_parts("types", Some(doc), &signature).unwrap();

        let types: Vec<_> = schema.parameters.iter().map(|p| p.param_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["string", "integer", "number", "boolean", "array", "object", "string", "string", "integer"]
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let first = derive_from_parts("add", Some(ADD_DOC), &add_signature()).unwrap();
        let second = derive_from_parts("add", Some(ADD_DOC), &add_signature()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_inconsistent_signature() {
        let duplicated = Signature::new().required::<i64>("a").optional::<i64>("a");
        assert!(matches!(
            derive_from_parts("add", Some(ADD_DOC), &duplicated),
            Err(AgentError::SchemaDerivation(_))
        ));
        assert!(matches!(
            derive_from_parts("  ", None, &Signature::new()),
            Err(AgentError::SchemaDerivation(_))
        ));
    }

    #[test]
    fn test_function_spec_shape() {
        let schema = derive_from_parts("add", Some(ADD_DOC), &add_signature()).unwrap();
        let value = serde_json::to_value(schema.function_spec()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "function",
                "function": {
                    "name": "add",
                    "description": "Add two numbers.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "a": {"type": "integer", "description": "first"},
                            "b": {"type": "integer", "description": "second"}
                        },
                        "required": ["a", "b"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_function_spec_keeps_docstring_order() {
        let doc = "Order.\nArgs:\n  zeta: last letter\n  alpha: first letter\n";
        let signature = Signature::new().required::<String>("alpha").required::<String>("zeta");
        let schema = derive_from_parts("order", Some(doc), &signature).unwrap();

        let text = serde_json::to_string(&schema.function_spec()).unwrap();
        assert!(text.find("\"zeta\"").unwrap() < text.find("\"alpha\"").unwrap());
    }
}
