//! Company registry: symbol -> surrogate id.
//!
//! The registry is append-only. `sync_companies` inserts symbols it has never seen
//! and reloads the whole map; it never touches an existing row. Emptying the
//! registry is only possible through [`Warehouse::rebuild_registry`].

use std::collections::{HashMap, HashSet};

use ::duckdb::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::{Warehouse, WarehouseError};

/// Venue a symbol was first seen on; selects which identifier column is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Euronext,
    Boursorama,
}

impl Venue {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euronext => "euronext",
            Self::Boursorama => "boursorama",
        }
    }
}

/// A symbol observed in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompany {
    pub symbol: String,
    pub isin: Option<String>,
}

/// A registry row supplied to a full rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanySeed {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default)]
    pub euronext: Option<String>,
    #[serde(default)]
    pub boursorama: Option<String>,
}

/// Snapshot of the symbol -> company id map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyIds(HashMap<String, i64>);

impl CompanyIds {
    pub fn resolve(&self, symbol: &str) -> Option<i64> {
        self.0.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of a registry sync.
#[derive(Debug, Clone)]
pub struct RegistrySync {
    pub created: usize,
    pub ids: CompanyIds,
}

/// Outcome of a full registry rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub intraday_removed: usize,
    pub daily_removed: usize,
    pub files_forgotten: usize,
    pub companies_removed: usize,
    pub companies_loaded: usize,
}

impl Warehouse {
    /// Register every symbol not yet present, then return the full id map.
    ///
    /// New rows get `name = symbol` and the venue identifier set to the symbol;
    /// the other venue's identifier stays NULL.
    pub fn sync_companies(
        &self,
        venue: Venue,
        companies: &[NewCompany],
    ) -> Result<RegistrySync, WarehouseError> {
        let connection = self.connection()?;
        let created = connection.transaction(|tx| insert_unseen(tx, venue, companies))?;
        if created > 0 {
            tracing::info!(venue = venue.as_str(), created, "registered new companies");
        }

        let ids = load_ids(&connection)?;
        Ok(RegistrySync { created, ids })
    }

    /// Current symbol -> id map.
    pub fn company_ids(&self) -> Result<CompanyIds, WarehouseError> {
        let connection = self.connection()?;
        load_ids(&connection)
    }

    /// Empty the time series, the ledger and the registry, then load `seeds` with
    /// ids starting again at 1.
    ///
    /// This is a maintenance operation; ingestion never calls it.
    pub fn rebuild_registry(&self, seeds: &[CompanySeed]) -> Result<RebuildReport, WarehouseError> {
        let mut seen = HashSet::new();
        for seed in seeds {
            if seed.symbol.trim().is_empty() {
                return Err(WarehouseError::QueryRejected(String::from(
                    "seed symbol must not be empty",
                )));
            }
            if !seen.insert(seed.symbol.as_str()) {
                return Err(WarehouseError::QueryRejected(format!(
                    "duplicate seed symbol '{}'",
                    seed.symbol
                )));
            }
        }

        let connection = self.connection()?;
        // Dependents go first; the registry is emptied last.
        let mut report = connection.transaction(|tx| {
            Ok(RebuildReport {
                intraday_removed: tx.execute("DELETE FROM stocks", [])?,
                daily_removed: tx.execute("DELETE FROM daystocks", [])?,
                files_forgotten: tx.execute("DELETE FROM file_done", [])?,
                companies_removed: tx.execute("DELETE FROM companies", [])?,
                companies_loaded: 0,
            })
        })?;

        report.companies_loaded = connection.transaction(|tx| {
            let mut insert = tx.prepare(
                "INSERT INTO companies (id, name, symbol, isin, euronext, boursorama) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            for (index, seed) in seeds.iter().enumerate() {
                let id = i64::try_from(index + 1).unwrap_or(i64::MAX);
                insert.execute(params![
                    id,
                    seed.name,
                    seed.symbol.trim(),
                    seed.isin,
                    seed.euronext,
                    seed.boursorama
                ])?;
            }
            Ok(seeds.len())
        })?;

        tracing::warn!(
            intraday_removed = report.intraday_removed,
            daily_removed = report.daily_removed,
            companies_loaded = report.companies_loaded,
            "company registry rebuilt"
        );
        Ok(report)
    }
}

fn insert_unseen(
    tx: &Connection,
    venue: Venue,
    companies: &[NewCompany],
) -> Result<usize, WarehouseError> {
    let mut known = HashSet::new();
    {
        let mut statement = tx.prepare("SELECT symbol FROM companies")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        for symbol in rows {
            known.insert(symbol?);
        }
    }

    let mut next_id: i64 =
        tx.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM companies", [], |row| row.get(0))?;

    let mut insert = tx.prepare(
        "INSERT INTO companies (id, name, symbol, isin, euronext, boursorama) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    let mut created = 0;
    for company in companies {
        let symbol = company.symbol.trim();
        if symbol.is_empty() || !known.insert(symbol.to_string()) {
            continue;
        }

        let (euronext, boursorama) = match venue {
            Venue::Euronext => (Some(symbol), None),
            Venue::Boursorama => (None, Some(symbol)),
        };
        insert.execute(params![
            next_id,
            symbol,
            symbol,
            company.isin,
            euronext,
            boursorama
        ])?;
        next_id += 1;
        created += 1;
    }

    Ok(created)
}

fn load_ids(connection: &Connection) -> Result<CompanyIds, WarehouseError> {
    let mut statement = connection.prepare("SELECT symbol, id FROM companies")?;
    let rows = statement.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut ids = HashMap::new();
    for row in rows {
        let (symbol, id) = row?;
        ids.insert(symbol, id);
    }
    Ok(CompanyIds(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::open_temp;

    fn company(symbol: &str) -> NewCompany {
        NewCompany {
            symbol: symbol.to_string(),
            isin: None,
        }
    }

    #[test]
    fn symbol_keeps_its_id_across_batches() {
        let (_temp, warehouse) = open_temp();

        let first = warehouse
            .sync_companies(Venue::Euronext, &[company("ABC"), company("XYZ")])
            .expect("first sync");
        let second = warehouse
            .sync_companies(Venue::Boursorama, &[company("ABC"), company("NEW")])
            .expect("second sync");

        assert_eq!(first.created, 2);
        assert_eq!(second.created, 1);
        assert_eq!(first.ids.resolve("ABC"), second.ids.resolve("ABC"));
        assert_eq!(second.ids.len(), 3);
        assert_eq!(warehouse.counts().expect("counts").companies, 3);
    }

    #[test]
    fn venue_identifier_is_populated_for_the_inserting_venue_only() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .sync_companies(
                Venue::Boursorama,
                &[NewCompany {
                    symbol: "1rPAIR".to_string(),
                    isin: Some("NL0000235190".to_string()),
                }],
            )
            .expect("sync");

        let connection = warehouse.connection().expect("connection");
        let (name, isin, euronext, boursorama): (String, Option<String>, Option<String>, Option<String>) =
            connection
                .query_row(
                    "SELECT name, isin, euronext, boursorama FROM companies WHERE symbol = '1rPAIR'",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .expect("row");
        assert_eq!(name, "1rPAIR");
        assert_eq!(isin.as_deref(), Some("NL0000235190"));
        assert_eq!(euronext, None);
        assert_eq!(boursorama.as_deref(), Some("1rPAIR"));
    }

    #[test]
    fn duplicate_symbols_in_one_batch_insert_once() {
        let (_temp, warehouse) = open_temp();
        let sync = warehouse
            .sync_companies(Venue::Euronext, &[company("ABC"), company("ABC")])
            .expect("sync");
        assert_eq!(sync.created, 1);
    }

    #[test]
    fn rebuild_resets_identity_counter_and_clears_dependents() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .sync_companies(Venue::Euronext, &[company("AAA"), company("BBB")])
            .expect("sync");
        warehouse
            .record_files(&["euronext/a.csv".to_string()])
            .expect("ledger");

        let report = warehouse
            .rebuild_registry(&[CompanySeed {
                name: "Bravo".to_string(),
                symbol: "BBB".to_string(),
                isin: None,
                euronext: Some("BBB".to_string()),
                boursorama: None,
            }])
            .expect("rebuild");

        assert_eq!(report.companies_removed, 2);
        assert_eq!(report.companies_loaded, 1);
        assert_eq!(report.files_forgotten, 1);
        let ids = warehouse.company_ids().expect("ids");
        assert_eq!(ids.resolve("BBB"), Some(1));
        assert_eq!(ids.resolve("AAA"), None);

        let next = warehouse
            .sync_companies(Venue::Euronext, &[company("CCC")])
            .expect("sync after rebuild");
        assert_eq!(next.ids.resolve("CCC"), Some(2));
    }

    #[test]
    fn rebuild_rejects_duplicate_seeds() {
        let (_temp, warehouse) = open_temp();
        let seed = CompanySeed {
            name: "A".to_string(),
            symbol: "A".to_string(),
            isin: None,
            euronext: None,
            boursorama: None,
        };
        let error = warehouse
            .rebuild_registry(&[seed.clone(), seed])
            .expect_err("duplicates rejected");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }
}
