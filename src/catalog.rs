//! Schema catalog for the local SSURGO database.
//!
//! Introspects a SQLite database once per session into an immutable
//! table -> column snapshot used by the local guard and the planner prompt.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::sqlite::SqlitePool;
use sqlx::Row as SqlxRow;
use tracing::debug;

use crate::error::{Result, SoilqError};

/// Schema description of the SDA remote backend.
///
/// SDA exposes no live introspection, so the planner prompt for the remote
/// backend uses this fixed summary of the allow-listed tabulars.
pub const SDA_SCHEMA_TEXT: &str = "\
SSURGO tabular schema (Soil Data Access):
Table: mapunit
  - mukey (PK), musym, muname, mukind, muacres, lkey
Table: component
  - cokey (PK), mukey (FK -> mapunit.mukey), compname, comppct_r,
    majcompflag, taxclname, drainagecl, runoff, hydgrp
Table: chorizon
  - chkey (PK), cokey (FK -> component.cokey), hzname, desgnmaster,
    hzdept_r, hzdepb_r, ksat_l, ksat_r, ksat_h, awc_r, om_r, dbthirdbar_r
Table: muaggatt
  - mukey (FK -> mapunit.mukey), hydgrpdcd, hydclprs, drclassdcd,
    flodfreqdcd, aws0100wta, brockdepmin
Table: cointerp
  - cokey (FK -> component.cokey), mrulename, interphr, interphrc
Table: legend
  - lkey (PK), areasymbol, areaname
Table: sacatalog
  - areasymbol, saversion, saverest
Table: sainterp
  - areasymbol, interpname, interpdesc
Table: chtexturegrp
  - chtgkey (PK), chkey (FK -> chorizon.chkey), texdesc, rvindicator
Table: chtexture
  - chtkey (PK), chtgkey (FK -> chtexturegrp.chtgkey), texcl
Table: chfrags
  - chfragskey (PK), chkey (FK -> chorizon.chkey), fragvol_r, fragsize_r
";

/// Immutable snapshot of the local database schema.
///
/// Built once per session via [`SchemaCatalog::introspect`] and shared
/// read-only for the rest of the `ask` invocation.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    /// Table name -> lower-cased column names.
    tables: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaCatalog {
    /// Introspects all tables and columns of the given SQLite database.
    pub async fn introspect(pool: &SqlitePool) -> Result<Self> {
        let table_names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| SoilqError::schema(format!("Failed to list tables: {e}")))?;

        let mut tables = BTreeMap::new();
        for table in table_names {
            // PRAGMA table_info quotes safely; table names come from
            // sqlite_master, not user input.
            let pragma = format!("PRAGMA table_info('{}')", table.replace('\'', "''"));
            let rows = sqlx::query(&pragma)
                .fetch_all(pool)
                .await
                .map_err(|e| {
                    SoilqError::schema(format!("Failed to read columns of {table}: {e}"))
                })?;

            let mut columns = BTreeSet::new();
            for row in rows {
                let name: String = row.try_get("name").map_err(|e| {
                    SoilqError::schema(format!("Malformed table_info row for {table}: {e}"))
                })?;
                columns.insert(name.to_lowercase());
            }
            tables.insert(table, columns);
        }

        debug!("Introspected {} tables", tables.len());
        Ok(Self { tables })
    }

    /// Builds a catalog from explicit table/column pairs.
    ///
    /// Used by tests and by callers that already know the schema.
    pub fn from_tables<T, C, I, J>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, J)>,
        J: IntoIterator<Item = C>,
        T: Into<String>,
        C: Into<String>,
    {
        let tables = entries
            .into_iter()
            .map(|(table, columns)| {
                (
                    table.into(),
                    columns
                        .into_iter()
                        .map(|c| c.into().to_lowercase())
                        .collect(),
                )
            })
            .collect();
        Self { tables }
    }

    /// Returns true if no tables were found.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterates over the known table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns true if the catalog contains the given table.
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Returns the column set for a table, if known.
    pub fn columns(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.tables.get(table)
    }

    /// Returns true if `table` has a column named `column` (case-insensitive).
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|cols| cols.contains(&column.to_lowercase()))
    }

    /// Formats the catalog for inclusion in the planner prompt.
    pub fn format_for_planner(&self) -> String {
        let mut out = String::from("Local SSURGO schema:\n");
        for (table, columns) in &self.tables {
            out.push_str(&format!("Table: {table}\n"));
            for column in columns {
                out.push_str(&format!("  - {column}\n"));
            }
        }
        out
    }
}
