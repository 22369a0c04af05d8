//! Schema descriptor for the `profiles` table.
//!
//! The descriptor is the textual contract handed to the model: it is rendered
//! verbatim into every SQL-generation prompt, and it is also the source of the
//! DDL used when loading profiles into a fresh store.

use serde::Serialize;

/// Name of the single queryable table.
pub const PROFILES_TABLE: &str = "profiles";

/// Declared column type, as presented to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Text,
    Float,
    Integer,
    Datetime,
}

impl DeclaredType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Datetime => "datetime",
        }
    }

    /// SQLite column type used in `CREATE TABLE`.
    ///
    /// `DATETIME` keeps its declared name so the executor can recover
    /// timestamps from the column's declared type.
    pub fn sqlite_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Float => "REAL",
            Self::Integer => "INTEGER",
            Self::Datetime => "DATETIME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub declared_type: DeclaredType,
    pub description: &'static str,
}

/// Immutable description of exactly one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescriptor {
    pub table: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl SchemaDescriptor {
    /// The ARGO float profile table produced by the NetCDF ETL.
    pub fn argo_profiles() -> Self {
        let col = |name: &'static str, declared_type, description: &'static str| ColumnSpec {
            name,
            declared_type,
            description,
        };
        Self {
            table: PROFILES_TABLE,
            columns: vec![
                col("float_id", DeclaredType::Text, "Float identifier"),
                col("PRES", DeclaredType::Float, "Pressure/depth in dbar"),
                col("TEMP", DeclaredType::Float, "Temperature in Celsius"),
                col("PSAL", DeclaredType::Float, "Salinity in PSU"),
                col("LATITUDE", DeclaredType::Float, "Latitude in degrees"),
                col("LONGITUDE", DeclaredType::Float, "Longitude in degrees"),
                col("TIME", DeclaredType::Datetime, "Measurement time"),
                col("profile_id", DeclaredType::Integer, "Profile index"),
            ],
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Text block embedded in prompts.
    pub fn render(&self) -> String {
        let mut out = format!("Table: {}\nColumns:\n", self.table);
        for c in &self.columns {
            out.push_str(&format!(
                "- {} ({}): {}\n",
                c.name,
                c.declared_type.as_str(),
                c.description
            ));
        }
        out
    }

    pub fn create_table_sql(&self, if_not_exists: bool) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.declared_type.sqlite_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
        format!("CREATE TABLE {guard}\"{}\" ({cols})", self.table)
    }
}
