//! Schema change operations
//!
//! The operation vocabulary is a closed set of tagged variants so that
//! artifact decoding rejects unknown operation tags and inversion can be
//! checked exhaustively. Drop variants carry the schema they remove, which
//! keeps create/drop inversion total in both directions.

use serde::{Deserialize, Serialize};

/// Column definition used by table and column operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// One reversible schema change
///
/// Serialized with an `op` tag (`create_table`, `add_column`, ...) inside
/// migration artifacts. `Raw` is the single variant with no computable
/// inverse; migrations containing it need an explicit down change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaOperation {
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: ColumnDef,
    },
    RenameTable {
        from: String,
        to: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    CreateIndex {
        table: String,
        name: String,
        columns: Vec<String>,
    },
    DropIndex {
        table: String,
        name: String,
        columns: Vec<String>,
    },
    /// Opaque statement; cannot be inverted structurally
    Raw {
        sql: String,
    },
}

impl SchemaOperation {
    /// Structural inverse of this operation, if one exists.
    ///
    /// Create and drop swap (both carry the column schema), renames swap
    /// their endpoints, and `Raw` returns `None`.
    pub fn invert(&self) -> Option<SchemaOperation> {
        match self {
            SchemaOperation::CreateTable { table, columns } => Some(SchemaOperation::DropTable {
                table: table.clone(),
                columns: columns.clone(),
            }),
            SchemaOperation::DropTable { table, columns } => Some(SchemaOperation::CreateTable {
                table: table.clone(),
                columns: columns.clone(),
            }),
            SchemaOperation::AddColumn { table, column } => Some(SchemaOperation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            }),
            SchemaOperation::DropColumn { table, column } => Some(SchemaOperation::AddColumn {
                table: table.clone(),
                column: column.clone(),
            }),
            SchemaOperation::RenameTable { from, to } => Some(SchemaOperation::RenameTable {
                from: to.clone(),
                to: from.clone(),
            }),
            SchemaOperation::RenameColumn { table, from, to } => {
                Some(SchemaOperation::RenameColumn {
                    table: table.clone(),
                    from: to.clone(),
                    to: from.clone(),
                })
            }
            SchemaOperation::CreateIndex {
                table,
                name,
                columns,
            } => Some(SchemaOperation::DropIndex {
                table: table.clone(),
                name: name.clone(),
                columns: columns.clone(),
            }),
            SchemaOperation::DropIndex {
                table,
                name,
                columns,
            } => Some(SchemaOperation::CreateIndex {
                table: table.clone(),
                name: name.clone(),
                columns: columns.clone(),
            }),
            SchemaOperation::Raw { .. } => None,
        }
    }

    /// Whether [`invert`](Self::invert) returns `Some` for this operation
    pub fn is_invertible(&self) -> bool {
        !matches!(self, SchemaOperation::Raw { .. })
    }
}
