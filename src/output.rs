//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization.

use serde_json::Value;
use tabled::{Table, Tabled};

use crate::descriptor::EndpointDescriptor;
use crate::hydrate::Model;

/// Trait for human-readable key-value output.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Model {
    fn pretty_print(&self) -> String {
        let header = format!("{}: {}", self.resource_type, self.id);
        let divider = "─".repeat(header.chars().count().max(30));
        let width = self
            .attributes
            .keys()
            .chain(self.relationships.keys())
            .map(String::len)
            .max()
            .unwrap_or(0)
            + 2;

        let mut lines = vec![header, divider];
        for (name, value) in &self.attributes {
            lines.push(format!("{:width$}{}", format!("{name}:"), display_value(value)));
        }
        for (name, relationship) in &self.relationships {
            let ids = relationship.ids();
            if !ids.is_empty() {
                lines.push(format!("{:width$}-> {}", format!("{name}:"), ids.join(", ")));
            }
        }
        lines.join("\n")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// One table row per model.
#[derive(Tabled)]
pub struct ModelRow {
    pub id: String,
    #[tabled(rename = "type")]
    pub resource_type: String,
    pub name: String,
}

impl From<&Model> for ModelRow {
    fn from(model: &Model) -> Self {
        let name = ["name", "display_name", "slug", "email", "title"]
            .iter()
            .find_map(|key| model.attr_str(key))
            .unwrap_or_default();
        Self {
            id: model.id.clone(),
            resource_type: model.resource_type.clone(),
            name: name.to_string(),
        }
    }
}

/// Render a list of models as a table or a JSON array.
pub fn render_models(models: &[Model], json: bool) -> String {
    if json {
        let array = Value::Array(models.iter().map(Model::to_json).collect());
        format!("{array:#}")
    } else {
        let rows: Vec<ModelRow> = models.iter().map(ModelRow::from).collect();
        format!("{}\n\n{} record(s)", Table::new(rows), models.len())
    }
}

/// Render one model as key-value lines or a JSON object.
pub fn render_model(model: &Model, json: bool) -> String {
    if json {
        format!("{:#}", model.to_json())
    } else {
        model.pretty_print()
    }
}

/// One table row per registry entry.
#[derive(Tabled)]
pub struct ResourceRow {
    pub name: &'static str,
    pub api: String,
    pub path: &'static str,
    pub version: &'static str,
}

impl From<&EndpointDescriptor> for ResourceRow {
    fn from(d: &EndpointDescriptor) -> Self {
        Self {
            name: d.name,
            api: d.generation.to_string(),
            path: d.path,
            version: d.required_version.unwrap_or("-"),
        }
    }
}
