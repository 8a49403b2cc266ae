//! Output formatters for inspection commands.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use serde::Serialize;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// One line of `schemagraph tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub schema: String,
    pub name: String,
    pub kind: String,
    pub columns: usize,
    pub constraints: usize,
    pub indexes: usize,
    pub relations: usize,
}

/// One line of `schemagraph relations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationLine {
    pub name: String,
    pub cardinality: String,
    pub target: String,
    pub join_table: Option<String>,
    pub constraint: String,
}

/// Resolved entity printed by `schemagraph get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDetail {
    pub kind: String,
    pub name: String,
    pub properties: Vec<(String, String)>,
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the table listing.
    fn format_tables(&self, tables: &[TableSummary]) -> String;

    /// Format a table's named relations.
    fn format_relations(&self, relations: &[RelationLine]) -> String;

    /// Format one resolved entity.
    fn format_entity(&self, entity: &EntityDetail) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_tables(&self, tables: &[TableSummary]) -> String {
        if tables.is_empty() {
            return "No tables".to_string();
        }
        let mut table = Table::new();
        table.set_header(vec![
            "Schema",
            "Table",
            "Kind",
            "Columns",
            "Constraints",
            "Indexes",
            "Relations",
        ]);
        for t in tables {
            table.add_row(vec![
                Cell::new(&t.schema),
                Cell::new(&t.name),
                Cell::new(&t.kind),
                Cell::new(t.columns),
                Cell::new(t.constraints),
                Cell::new(t.indexes),
                Cell::new(t.relations),
            ]);
        }
        table.to_string()
    }

    fn format_relations(&self, relations: &[RelationLine]) -> String {
        if relations.is_empty() {
            return "No relations".to_string();
        }
        let mut table = Table::new();
        table.set_header(vec!["Name", "Cardinality", "Target", "Through", "Constraint"]);
        for r in relations {
            table.add_row(vec![
                Cell::new(&r.name),
                Cell::new(&r.cardinality),
                Cell::new(&r.target),
                Cell::new(r.join_table.as_deref().unwrap_or("")),
                Cell::new(&r.constraint),
            ]);
        }
        table.to_string()
    }

    fn format_entity(&self, entity: &EntityDetail) -> String {
        let mut table = Table::new();
        table.set_header(vec![Cell::new(&entity.kind), Cell::new(&entity.name)]);
        for (key, value) in &entity.properties {
            table.add_row(vec![key, value]);
        }
        table.to_string()
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

impl Formatter for JsonFormatter {
    fn format_tables(&self, tables: &[TableSummary]) -> String {
        to_json(tables)
    }

    fn format_relations(&self, relations: &[RelationLine]) -> String {
        to_json(relations)
    }

    fn format_entity(&self, entity: &EntityDetail) -> String {
        let properties: serde_json::Map<String, serde_json::Value> = entity
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        to_json(&serde_json::json!({
            "kind": entity.kind,
            "name": entity.name,
            "properties": properties,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_tables(&self, tables: &[TableSummary]) -> String {
        let mut output = String::from("schema,table,kind,columns,constraints,indexes,relations\n");
        for t in tables {
            output.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                csv_field(&t.schema),
                csv_field(&t.name),
                t.kind,
                t.columns,
                t.constraints,
                t.indexes,
                t.relations
            ));
        }
        output
    }

    fn format_relations(&self, relations: &[RelationLine]) -> String {
        let mut output = String::from("name,cardinality,target,through,constraint\n");
        for r in relations {
            output.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_field(&r.name),
                r.cardinality,
                csv_field(&r.target),
                csv_field(r.join_table.as_deref().unwrap_or("")),
                csv_field(&r.constraint)
            ));
        }
        output
    }

    fn format_entity(&self, entity: &EntityDetail) -> String {
        let mut output = String::from("property,value\n");
        output.push_str(&format!("kind,{}\n", csv_field(&entity.kind)));
        output.push_str(&format!("name,{}\n", csv_field(&entity.name)));
        for (key, value) in &entity.properties {
            output.push_str(&format!("{},{}\n", csv_field(key), csv_field(value)));
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
