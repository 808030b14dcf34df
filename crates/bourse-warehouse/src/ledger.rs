//! Ingestion ledger: names of files already loaded.

use std::collections::HashSet;

use ::duckdb::params;

use crate::{Warehouse, WarehouseError};

impl Warehouse {
    pub fn is_file_done(&self, name: &str) -> Result<bool, WarehouseError> {
        let connection = self.connection()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM file_done WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Every recorded file name; used to gate a whole batch with one query.
    pub fn done_files(&self) -> Result<HashSet<String>, WarehouseError> {
        let connection = self.connection()?;
        let mut statement = connection.prepare("SELECT name FROM file_done")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = HashSet::new();
        for name in rows {
            names.insert(name?);
        }
        Ok(names)
    }

    /// Mark files as processed. Names already present are left untouched; returns
    /// how many were newly recorded.
    pub fn record_files(&self, names: &[String]) -> Result<usize, WarehouseError> {
        if names.is_empty() {
            return Ok(0);
        }

        let connection = self.connection()?;
        connection.transaction(|tx| {
            let mut insert =
                tx.prepare("INSERT INTO file_done (name) VALUES (?) ON CONFLICT DO NOTHING")?;
            let mut recorded = 0;
            for name in names {
                recorded += insert.execute(params![name])?;
            }
            Ok(recorded)
        })
    }

    /// Recorded file names in name order.
    pub fn files_done(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.connection()?;
        let mut statement = connection.prepare("SELECT name FROM file_done ORDER BY name")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|row| row.map_err(WarehouseError::from)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::open_temp;

    #[test]
    fn recording_is_insert_if_absent() {
        let (_temp, warehouse) = open_temp();
        let names = vec![
            "euronext/2024-01-02.csv".to_string(),
            "boursorama/2024/a.json".to_string(),
        ];

        assert_eq!(warehouse.record_files(&names).expect("first"), 2);
        assert_eq!(warehouse.record_files(&names[..1]).expect("second"), 0);

        assert!(warehouse.is_file_done("euronext/2024-01-02.csv").expect("lookup"));
        assert!(!warehouse.is_file_done("euronext/other.csv").expect("lookup"));
        assert_eq!(warehouse.done_files().expect("done").len(), 2);
        assert_eq!(
            warehouse.files_done().expect("listing"),
            vec![
                "boursorama/2024/a.json".to_string(),
                "euronext/2024-01-02.csv".to_string()
            ]
        );
    }
}
