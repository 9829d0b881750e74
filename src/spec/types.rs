use crate::error::LoadError;
use http::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Path-item keys that declare operations, in the order routes are emitted.
pub const OPERATION_KEYS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Map a path-item key (`get`, `post`, ...) to its HTTP method.
pub fn method_for_key(key: &str) -> Option<Method> {
    match key {
        "get" => Some(Method::GET),
        "put" => Some(Method::PUT),
        "post" => Some(Method::POST),
        "delete" => Some(Method::DELETE),
        "options" => Some(Method::OPTIONS),
        "head" => Some(Method::HEAD),
        "patch" => Some(Method::PATCH),
        "trace" => Some(Method::TRACE),
        _ => None,
    }
}

/// One parsed spec file.
///
/// Identity is the source file path. The document is immutable once loaded;
/// the pipeline only ever borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    path: PathBuf,
    relative_path: PathBuf,
    raw: Value,
}

impl SpecDocument {
    /// Wrap an already parsed JSON value. The root must be a JSON object.
    pub fn from_value(
        path: impl Into<PathBuf>,
        relative_path: impl Into<PathBuf>,
        raw: Value,
    ) -> Result<Self, LoadError> {
        let path = path.into();
        if !raw.is_object() {
            return Err(LoadError::new(path, "document root is not a JSON object"));
        }
        Ok(SpecDocument {
            path,
            relative_path: relative_path.into(),
            raw,
        })
    }

    /// Source file of this document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the discovery root (the sort key)
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// The raw JSON document
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn openapi_version(&self) -> Option<&str> {
        self.raw.get("openapi").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.raw
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
    }

    /// The `paths` object, if present and well formed
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.raw.get("paths").and_then(Value::as_object)
    }

    /// The `components.schemas` table, if present
    pub fn component_schemas(&self) -> Option<&Map<String, Value>> {
        self.raw
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
    }

    /// Look up a document-local reference such as `#/components/responses/NotFound`.
    ///
    /// JSON pointer escapes (`~0`, `~1`) are honoured. External references return `None`.
    pub fn resolve_local(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.raw);
        }
        self.raw.pointer(pointer)
    }

    /// Every operation of the document, in `paths` order then [`OPERATION_KEYS`] order.
    pub fn operations(&self) -> Vec<OperationRef<'_>> {
        let mut out = Vec::new();
        let Some(paths) = self.paths() else {
            return out;
        };
        for (path, item) in paths {
            let Some(item_obj) = item.as_object() else {
                continue;
            };
            for key in OPERATION_KEYS {
                if let (Some(operation), Some(method)) = (item_obj.get(key), method_for_key(key)) {
                    out.push(OperationRef {
                        path,
                        method,
                        operation,
                        path_item: item,
                    });
                }
            }
        }
        out
    }
}

/// Borrowed view of one (path, method) operation inside a [`SpecDocument`].
#[derive(Debug, Clone)]
pub struct OperationRef<'a> {
    pub path: &'a str,
    pub method: Method,
    pub operation: &'a Value,
    pub path_item: &'a Value,
}

impl<'a> OperationRef<'a> {
    /// `"/pets POST"` style location used in diagnostics
    pub fn location(&self) -> String {
        format!("{} {}", self.path, self.method)
    }

    pub fn operation_id(&self) -> Option<&'a str> {
        self.operation.get("operationId").and_then(Value::as_str)
    }

    pub fn summary(&self) -> Option<&'a str> {
        self.operation.get("summary").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&'a str> {
        self.operation.get("description").and_then(Value::as_str)
    }

    pub fn deprecated(&self) -> bool {
        self.operation
            .get("deprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn tags(&self) -> Vec<String> {
        self.operation
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Path-level parameters followed by operation-level ones, `$ref`s resolved.
    ///
    /// Parameters without a `name` are skipped here; the default validator reports them.
    pub fn parameters(&self, doc: &SpecDocument) -> Vec<ParameterMeta> {
        let mut out = Vec::new();
        for source in [self.path_item, self.operation] {
            let Some(params) = source.get("parameters").and_then(Value::as_array) else {
                continue;
            };
            for param in params {
                let param = match param.get("$ref").and_then(Value::as_str) {
                    Some(reference) => match doc.resolve_local(reference) {
                        Some(resolved) => resolved,
                        None => continue,
                    },
                    None => param,
                };
                if let Some(meta) = ParameterMeta::from_value(param) {
                    out.push(meta);
                }
            }
        }
        out
    }
}

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "Path"),
            ParameterLocation::Query => write!(f, "Query"),
            ParameterLocation::Header => write!(f, "Header"),
            ParameterLocation::Cookie => write!(f, "Cookie"),
        }
    }
}

/// Documentation metadata of one declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<Value>,
}

impl ParameterMeta {
    fn from_value(param: &Value) -> Option<Self> {
        let name = param.get("name").and_then(Value::as_str)?;
        let location = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParameterLocation::parse)?;
        Some(ParameterMeta {
            name: name.to_string(),
            location,
            // path parameters are always required
            required: location == ParameterLocation::Path
                || param.get("required").and_then(Value::as_bool).unwrap_or(false),
            description: param
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            schema: param.get("schema").cloned(),
        })
    }
}
