//! Evaluation context and variable resolution
//!
//! The context carries everything a condition may look at. Conditions address
//! it through dotted paths (`resource.ownerId`, `request.ip`) rooted at one of
//! `principal`, `resource`, `request`, `scope` or `context`. Condition values
//! of the exact form `${path}` are replaced by the value found at that path.

use crate::types::Scope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The principal making the request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalContext {
    /// Principal identifier
    pub id: String,

    /// Tenant the principal belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Role memberships
    #[serde(default)]
    pub roles: Vec<String>,

    /// Group memberships
    #[serde(default)]
    pub groups: Vec<String>,

    /// Additional attributes (department, clearance, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl PrincipalContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(tenant_id) = &self.tenant_id {
            map.insert("tenantId".to_string(), Value::String(tenant_id.clone()));
        }
        map.insert("roles".to_string(), strings_to_value(&self.roles));
        map.insert("groups".to_string(), strings_to_value(&self.groups));
        Value::Object(map)
    }
}

/// The resource being accessed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceContext {
    /// Resource type (invoice, document, ...)
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resource identifier
    pub id: String,

    /// Additional attributes (ownerId, sensitivity, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ResourceContext {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.insert("type".to_string(), Value::String(self.resource_type.clone()));
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

/// Request metadata supplied by the adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Client IP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        let fields = [("method", &self.method), ("path", &self.path), ("ip", &self.ip)];
        for (key, field) in fields {
            if let Some(value) = field {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        Value::Object(map)
    }
}

/// Everything a condition can reference during one evaluation
///
/// Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub principal: PrincipalContext,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,

    /// Free-form extra attributes, addressed as `context.<key>`
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl EvaluationContext {
    /// Create a context for the given principal
    pub fn new(principal: PrincipalContext) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: ResourceContext) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Compose the lookup view used for path resolution
    pub fn view(&self) -> ContextView {
        ContextView::new(self)
    }
}

/// Composed JSON view `{principal, resource, request, scope, context}`
///
/// Built once per evaluation call so that repeated lookups don't rebuild it.
#[derive(Debug, Clone)]
pub struct ContextView {
    root: Value,
}

impl ContextView {
    pub fn new(ctx: &EvaluationContext) -> Self {
        let mut root = Map::new();
        root.insert("principal".to_string(), ctx.principal.to_value());
        if let Some(resource) = &ctx.resource {
            root.insert("resource".to_string(), resource.to_value());
        }
        if let Some(request) = &ctx.request {
            root.insert("request".to_string(), request.to_value());
        }
        if let Some(scope) = &ctx.scope {
            root.insert("scope".to_string(), scope_to_value(scope));
        }
        root.insert("context".to_string(), Value::Object(ctx.context.clone()));

        Self {
            root: Value::Object(root),
        }
    }

    /// Look up a dotted path; `None` if any segment is missing
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        get_path(&self.root, path)
    }

    /// Resolve a `${path}` template, or return the literal string unchanged
    ///
    /// Returns `None` only when the template references a missing path.
    pub fn resolve(&self, template: &str) -> Option<Value> {
        match template_path(template) {
            Some(path) => self.get_path(path).cloned(),
            None => Some(Value::String(template.to_string())),
        }
    }

    /// Resolve every template inside a condition operand
    ///
    /// Strings are resolved directly and arrays element-wise. A reference to a
    /// missing path becomes `null`, which every typed comparison rejects.
    pub fn resolve_value(&self, expected: &Value) -> Value {
        match expected {
            Value::String(template) => self.resolve(template).unwrap_or(Value::Null),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.resolve_value(item)).collect()),
            other => other.clone(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

/// Resolve a template against a context
pub fn resolve(template: &str, ctx: &EvaluationContext) -> Option<Value> {
    ctx.view().resolve(template)
}

/// Dotted-path lookup over nested JSON
///
/// Object segments are keys, array segments are decimal indices.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}

/// Extract `path` from a string that is exactly `${path}`
fn template_path(template: &str) -> Option<&str> {
    template
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|path| !path.is_empty())
}

fn strings_to_value(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn scope_to_value(scope: &Scope) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(scope.scope_type.to_string()));
    if let Some(id) = &scope.id {
        map.insert("id".to_string(), Value::String(id.clone()));
    }
    Value::Object(map)
}
