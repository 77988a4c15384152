//! Migration naming policies
//!
//! A naming policy derives the canonical, sortable identifier for a new
//! migration from its change set. Policies are pure: the creation timestamp
//! is an explicit argument (the registry passes `Utc::now()`), and the
//! disambiguation counter is driven solely by the supplied identifier set,
//! so a fixed input always produces the same name.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::mem::discriminant;

use crate::error::MigrationError;
use crate::operation::SchemaOperation;

/// Tag of the built-in change-derived naming policy
pub const DERIVE_FROM_CHANGES: &str = "derive-from-changes";

/// Maximum length of the descriptive part of an identifier
const MAX_SLUG_LEN: usize = 48;

/// Derives a migration identifier from a change set.
///
/// The result must be lexically sortable in creation order, distinct from
/// every identifier in `existing`, and never fail; an empty change set gets
/// a generic placeholder name.
pub trait NamingPolicy {
    fn generate(
        &self,
        change_set: &[SchemaOperation],
        existing: &BTreeSet<String>,
        created_at: DateTime<Utc>,
    ) -> String;
}

/// Resolve a configured naming-policy tag to its implementation.
///
/// Unknown tags fail here, at registry construction, rather than at first
/// use.
pub fn policy_for_tag(tag: &str) -> Result<Box<dyn NamingPolicy>, MigrationError> {
    match tag {
        DERIVE_FROM_CHANGES => Ok(Box::new(DeriveFromChanges)),
        other => Err(MigrationError::UnknownNamingPolicy(other.to_string())),
    }
}

/// Names migrations `{YYYYMMDDHHMMSS}_{slug}`, where the slug summarizes the
/// dominant operation of a homogeneous change set and falls back to a
/// generic label otherwise. Collisions with existing identifiers get a
/// `_2`, `_3`, ... suffix (smallest free counter).
pub struct DeriveFromChanges;

impl NamingPolicy for DeriveFromChanges {
    fn generate(
        &self,
        change_set: &[SchemaOperation],
        existing: &BTreeSet<String>,
        created_at: DateTime<Utc>,
    ) -> String {
        let base = format!(
            "{}_{}",
            created_at.format("%Y%m%d%H%M%S"),
            slug_for(change_set)
        );

        if !existing.contains(&base) {
            return base;
        }

        let mut counter: u32 = 2;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if !existing.contains(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Descriptive label for a change set
fn slug_for(change_set: &[SchemaOperation]) -> String {
    let Some(first) = change_set.first() else {
        return "migration".to_string();
    };

    // Heterogeneous change sets get the generic label
    let kind = discriminant(first);
    if change_set.iter().any(|op| discriminant(op) != kind) {
        return "change_schema".to_string();
    }

    let slug = match first {
        SchemaOperation::CreateTable { .. } => {
            format!("create_{}", joined_tables(change_set))
        }
        SchemaOperation::DropTable { .. } => {
            format!("drop_{}", joined_tables(change_set))
        }
        SchemaOperation::AddColumn { table, .. } => match single_table(change_set, table) {
            Some(columns) => format!("add_{}_to_{}", columns.join("_"), table),
            None => "change_schema".to_string(),
        },
        SchemaOperation::DropColumn { table, .. } => match single_table(change_set, table) {
            Some(columns) => format!("drop_{}_from_{}", columns.join("_"), table),
            None => "change_schema".to_string(),
        },
        SchemaOperation::RenameTable { from, to } if change_set.len() == 1 => {
            format!("rename_{}_to_{}", from, to)
        }
        SchemaOperation::RenameColumn { from, to, .. } if change_set.len() == 1 => {
            format!("rename_{}_to_{}", from, to)
        }
        SchemaOperation::CreateIndex { name, .. } if change_set.len() == 1 => {
            format!("create_index_{}", name)
        }
        SchemaOperation::CreateIndex { .. } => "create_indexes".to_string(),
        SchemaOperation::DropIndex { name, .. } if change_set.len() == 1 => {
            format!("drop_index_{}", name)
        }
        SchemaOperation::DropIndex { .. } => "drop_indexes".to_string(),
        _ => "change_schema".to_string(),
    };

    sanitize(&slug)
}

fn joined_tables(change_set: &[SchemaOperation]) -> String {
    let tables: Vec<&str> = change_set
        .iter()
        .filter_map(|op| match op {
            SchemaOperation::CreateTable { table, .. }
            | SchemaOperation::DropTable { table, .. } => Some(table.as_str()),
            _ => None,
        })
        .collect();
    tables.join("_")
}

/// Column names when every operation targets `table`, `None` otherwise
fn single_table<'a>(
    change_set: &'a [SchemaOperation],
    table: &str,
) -> Option<Vec<&'a str>> {
    let mut columns = Vec::with_capacity(change_set.len());
    for op in change_set {
        match op {
            SchemaOperation::AddColumn { table: t, column }
            | SchemaOperation::DropColumn { table: t, column }
                if t == table =>
            {
                columns.push(column.name.as_str());
            }
            _ => return None,
        }
    }
    Some(columns)
}

/// Lowercase, replace anything outside `[a-z0-9]` with `_`, collapse runs,
/// and cap the length so identifiers stay scannable
fn sanitize(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut last_was_separator = true;

    for ch in raw.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_separator = false;
        } else if !last_was_separator {
            slug.push('_');
            last_was_separator = true;
        }
    }

    while slug.len() > MAX_SLUG_LEN || slug.ends_with('_') {
        slug.pop();
    }

    if slug.is_empty() {
        "migration".to_string()
    } else {
        slug
    }
}
