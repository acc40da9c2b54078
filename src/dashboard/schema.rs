//! Attribute schema for the dashboard resource
//!
//! Schemas are plain values. Every builder method takes `self` and returns
//! the modified copy, so a shared base schema can be specialised without
//! affecting anyone else holding it.

use std::collections::BTreeSet;

/// How an attribute gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be set in config
    Required,
    /// May be set in config
    Optional,
    /// Set by the service; config may not set it
    Computed,
}

/// Returns true when two values should be treated as equal
pub type SuppressDiff = fn(&str, &str) -> bool;

/// One attribute of a resource
#[derive(Debug, Clone)]
pub struct Attribute {
    name: &'static str,
    presence: Presence,
    force_new: bool,
    conflicts_with: Vec<&'static str>,
    default: Option<bool>,
    suppress_diff: Option<SuppressDiff>,
}

impl Attribute {
    /// An optional attribute with no default
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            presence: Presence::Optional,
            force_new: false,
            conflicts_with: Vec::new(),
            default: None,
            suppress_diff: None,
        }
    }

    pub fn set_required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn set_computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    /// Changing this attribute replaces the resource
    pub fn set_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn set_conflicts_with(mut self, others: &[&'static str]) -> Self {
        for &other in others {
            if !self.conflicts_with.contains(&other) {
                self.conflicts_with.push(other);
            }
        }
        self
    }

    /// Value used when a boolean attribute is not set
    pub fn set_default(mut self, value: bool) -> Self {
        self.default = Some(value);
        self
    }

    pub fn set_suppress_diff(mut self, suppress: SuppressDiff) -> Self {
        self.suppress_diff = Some(suppress);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_force_new(&self) -> bool {
        self.force_new
    }

    pub fn default(&self) -> Option<bool> {
        self.default
    }

    /// Whether going from `old` to `new` is a real change
    pub fn differs(&self, old: &str, new: &str) -> bool {
        match self.suppress_diff {
            Some(suppress) => !suppress(old, new),
            None => old != new,
        }
    }
}

/// The attributes of one resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    attributes: Vec<Attribute>,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, replacing one with the same name
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.retain(|a| a.name != attribute.name);
        self.attributes.push(attribute);
        self
    }

    /// Return a copy with one attribute modified
    ///
    /// Unknown names leave the schema unchanged.
    pub fn customize(
        mut self,
        name: &str,
        modify: impl FnOnce(Attribute) -> Attribute,
    ) -> Self {
        if let Some(index) = self.attributes.iter().position(|a| a.name == name) {
            let attribute = self.attributes.remove(index);
            self.attributes.insert(index, modify(attribute));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes a user may set
    pub fn configurable(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.presence != Presence::Computed)
    }

    /// Default of an attribute, if it has one
    pub fn default_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.default()
    }

    /// Check which attributes are set against the schema
    ///
    /// Returns one message per problem, in attribute order.
    pub fn validate(&self, set: &BTreeSet<&str>) -> Vec<String> {
        let mut problems = Vec::new();

        for name in set {
            if self.get(name).is_none() {
                problems.push(format!("unknown attribute '{name}'"));
            }
        }

        for attribute in &self.attributes {
            let is_set = set.contains(attribute.name);
            match attribute.presence {
                Presence::Required if !is_set => {
                    problems.push(format!("'{}' is required", attribute.name));
                }
                Presence::Computed if is_set => {
                    problems.push(format!(
                        "'{}' is computed by the service and cannot be set",
                        attribute.name
                    ));
                }
                _ => {}
            }

            if is_set {
                for other in &attribute.conflicts_with {
                    // Report each conflicting pair once
                    if set.contains(other) && attribute.name < *other {
                        problems.push(format!(
                            "'{}' conflicts with '{}'",
                            attribute.name, other
                        ));
                    }
                }
            }
        }

        problems
    }
}

/// `/Workspace/Shared` and `/Shared` are the same folder
fn same_workspace_path(old: &str, new: &str) -> bool {
    super::normalize_parent_path(old) == super::normalize_parent_path(new)
}

/// Schema of the dashboard resource
pub fn dashboard_schema() -> ResourceSchema {
    let base = [
        "display_name",
        "parent_path",
        "warehouse_id",
        "embed_credentials",
        "serialized_dashboard",
        "file_path",
        "dashboard_id",
        "etag",
        "path",
        "lifecycle_state",
        "create_time",
        "update_time",
        "fingerprint",
    ]
    .into_iter()
    .fold(ResourceSchema::new(), |schema, name| {
        schema.attribute(Attribute::new(name))
    });

    let base = ["display_name", "parent_path", "warehouse_id"]
        .into_iter()
        .fold(base, |schema, name| schema.customize(name, Attribute::set_required));

    let base = [
        "dashboard_id",
        "etag",
        "path",
        "lifecycle_state",
        "create_time",
        "update_time",
        "fingerprint",
    ]
    .into_iter()
    .fold(base, |schema, name| schema.customize(name, Attribute::set_computed));

    base.customize("parent_path", |a| {
        a.set_suppress_diff(same_workspace_path).set_force_new()
    })
    .customize("serialized_dashboard", |a| a.set_conflicts_with(&["file_path"]))
    .customize("file_path", |a| a.set_conflicts_with(&["serialized_dashboard"]))
    .customize("embed_credentials", |a| {
        a.set_default(true)
    })
}
