use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;

use crate::error::HarvestError;
use crate::model::Record;
use crate::store::RecordStore;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id          INTEGER PRIMARY KEY,
            name        TEXT UNIQUE NOT NULL,
            url         TEXT NOT NULL,
            verdict     TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            score       REAL NOT NULL DEFAULT 0,
            category    TEXT NOT NULL DEFAULT '',
            image_url   TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_verdict ON profiles(verdict);
        CREATE INDEX IF NOT EXISTS idx_profiles_category ON profiles(category);

        CREATE TABLE IF NOT EXISTS pros (
            id         INTEGER PRIMARY KEY,
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            position   INTEGER NOT NULL,
            content    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pros_profile ON pros(profile_id);

        CREATE TABLE IF NOT EXISTS cons (
            id         INTEGER PRIMARY KEY,
            profile_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            position   INTEGER NOT NULL,
            content    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cons_profile ON cons(profile_id);
        ",
    )?;
    Ok(())
}

// ── Writes ──

/// Insert or replace one profile by name. `created_at` of an existing row is
/// left alone; pros and cons rows are replaced wholesale.
pub fn upsert_record(conn: &Connection, r: &Record) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO profiles
            (name, url, verdict, description, score, category, image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(name) DO UPDATE SET
            url = excluded.url,
            verdict = excluded.verdict,
            description = excluded.description,
            score = excluded.score,
            category = excluded.category,
            image_url = excluded.image_url,
            updated_at = excluded.updated_at",
        rusqlite::params![
            r.name,
            r.url,
            r.verdict,
            r.description,
            r.score,
            r.category,
            r.image_url,
            r.created_at.to_rfc3339(),
            r.updated_at.to_rfc3339(),
        ],
    )?;

    let profile_id: i64 = tx.query_row(
        "SELECT id FROM profiles WHERE name = ?1",
        [&r.name],
        |row| row.get(0),
    )?;

    for (table, items) in [("pros", &r.pros), ("cons", &r.cons)] {
        tx.execute(
            &format!("DELETE FROM {} WHERE profile_id = ?1", table),
            [profile_id],
        )?;
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} (profile_id, position, content) VALUES (?1, ?2, ?3)",
            table
        ))?;
        for (pos, item) in items.iter().enumerate() {
            stmt.execute(rusqlite::params![profile_id, pos as i64, item])?;
        }
    }

    tx.commit()?;
    Ok(())
}

pub fn upsert_records(conn: &Connection, records: &[Record]) -> Result<usize> {
    for r in records {
        upsert_record(conn, r).with_context(|| format!("Failed to save {}", r.name))?;
    }
    Ok(records.len())
}

// ── Reads ──

const SELECT_PROFILES: &str = "SELECT id, name, url, verdict, description, score, category,
        image_url, created_at, updated_at
     FROM profiles";

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Run a profile query and attach each row's pros and cons.
fn query_records(
    conn: &Connection,
    tail: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Record>> {
    let sql = format!("{} {}", SELECT_PROFILES, tail);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            let id: i64 = row.get(0)?;
            Ok((
                id,
                Record {
                    name: row.get(1)?,
                    url: row.get(2)?,
                    verdict: row.get(3)?,
                    description: row.get(4)?,
                    pros: Vec::new(),
                    cons: Vec::new(),
                    score: row.get(5)?,
                    category: row.get(6)?,
                    image_url: row.get(7)?,
                    created_at: parse_ts(8, row.get(8)?)?,
                    updated_at: parse_ts(9, row.get(9)?)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut pros = conn.prepare("SELECT content FROM pros WHERE profile_id = ?1 ORDER BY position")?;
    let mut cons = conn.prepare("SELECT content FROM cons WHERE profile_id = ?1 ORDER BY position")?;

    let mut records = Vec::with_capacity(rows.len());
    for (id, mut r) in rows {
        r.pros = pros
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        r.cons = cons
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        records.push(r);
    }
    Ok(records)
}

pub fn load_records(conn: &Connection) -> Result<Vec<Record>> {
    query_records(conn, "ORDER BY name", &[])
}

pub fn get_record(conn: &Connection, name: &str) -> Result<Option<Record>> {
    // Exact key first, then a case-insensitive match for convenience.
    let exact = query_records(conn, "WHERE name = ?1", &[&name])?;
    if let Some(r) = exact.into_iter().next() {
        return Ok(Some(r));
    }
    let loose = query_records(conn, "WHERE name = ?1 COLLATE NOCASE LIMIT 1", &[&name])?;
    Ok(loose.into_iter().next())
}

pub fn list_records(conn: &Connection, limit: usize) -> Result<Vec<Record>> {
    let limit = limit as i64;
    query_records(conn, "ORDER BY name LIMIT ?1", &[&limit])
}

/// Substring match on name or description.
pub fn search_records(conn: &Connection, query: &str) -> Result<Vec<Record>> {
    let pattern = format!("%{}%", query);
    query_records(
        conn,
        "WHERE name LIKE ?1 OR description LIKE ?1 ORDER BY name",
        &[&pattern],
    )
}

pub fn records_by_verdict(conn: &Connection, verdict: &str) -> Result<Vec<Record>> {
    query_records(conn, "WHERE verdict = ?1 COLLATE NOCASE ORDER BY name", &[&verdict])
}

pub fn records_by_category(conn: &Connection, category: &str) -> Result<Vec<Record>> {
    query_records(conn, "WHERE category = ?1 COLLATE NOCASE ORDER BY name", &[&category])
}

// ── Stats ──

pub struct Stats {
    pub profiles: usize,
    pub with_description: usize,
    pub pros: usize,
    pub cons: usize,
    pub verdicts: Vec<(String, usize)>,
    pub categories: Vec<(String, usize)>,
}

fn grouped(conn: &Connection, column: &str) -> Result<Vec<(String, usize)>> {
    let sql = format!(
        "SELECT {col}, COUNT(*) AS n FROM profiles WHERE {col} != ''
         GROUP BY {col} ORDER BY n DESC, {col}",
        col = column
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let profiles: usize = conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?;
    let with_description: usize = conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE description != ''",
        [],
        |r| r.get(0),
    )?;
    let pros: usize = conn.query_row("SELECT COUNT(*) FROM pros", [], |r| r.get(0))?;
    let cons: usize = conn.query_row("SELECT COUNT(*) FROM cons", [], |r| r.get(0))?;
    Ok(Stats {
        profiles,
        with_description,
        pros,
        cons,
        verdicts: grouped(conn, "verdict")?,
        categories: grouped(conn, "category")?,
    })
}

// ── Store ──

/// The primary store: an open connection with the schema in place.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(connect(path)?)
    }

    pub fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn).context("Failed to create schema")?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteStore {
    fn label(&self) -> &'static str {
        "sqlite"
    }

    fn upsert(&mut self, record: &Record) -> crate::error::Result<()> {
        upsert_record(&self.conn, record)
            .with_context(|| format!("Failed to upsert {}", record.name))
            .map_err(HarvestError::persistence)
    }

    fn load_all(&self) -> crate::error::Result<Vec<Record>> {
        load_records(&self.conn).map_err(HarvestError::persistence)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{now, Seed};
    use chrono::Duration;

    fn store() -> SqliteStore {
        SqliteStore::with_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn record(name: &str, verdict: &str, category: &str) -> Record {
        let mut r = Record::from_seed(&Seed::new("http://site.test", 1));
        r.name = name.to_string();
        r.verdict = verdict.to_string();
        r.category = category.to_string();
        r.description = format!("{} is somebody.", name);
        r.pros = vec!["First pro".into(), "Second pro".into()];
        r.cons = vec!["Only con".into()];
        r
    }

    #[test]
    fn upsert_round_trips_lists_in_order() {
        let mut s = store();
        let r = record("Adam Sandler", "Jew", "Entertainment");
        s.upsert(&r).unwrap();

        let loaded = s.load_all().unwrap();
        assert_eq!(loaded, vec![r]);
    }

    #[test]
    fn upsert_is_idempotent_and_keeps_created_at() {
        let mut s = store();
        let first = record("Madonna", "Not a Jew", "Music");
        s.upsert(&first).unwrap();
        s.upsert(&first).unwrap();
        assert_eq!(s.load_all().unwrap().len(), 1);

        let mut second = record("Madonna", "Jew-ish", "Music");
        second.created_at = now() + Duration::days(1);
        second.updated_at = second.created_at;
        second.pros = vec!["Kabbalah".into()];
        s.upsert(&second).unwrap();

        let got = get_record(s.conn(), "Madonna").unwrap().unwrap();
        assert_eq!(got.verdict, "Jew-ish");
        assert_eq!(got.pros, vec!["Kabbalah"]);
        assert_eq!(got.created_at, first.created_at);
        assert_eq!(got.updated_at, second.updated_at);

        let pros: usize = s
            .conn()
            .query_row("SELECT COUNT(*) FROM pros", [], |r| r.get(0))
            .unwrap();
        assert_eq!(pros, 1);
    }

    #[test]
    fn queries_filter_and_search() {
        let s = store();
        upsert_records(
            s.conn(),
            &[
                record("Adam Sandler", "Jew", "Entertainment"),
                record("Bob Dylan", "Jew", "Music"),
                record("Madonna", "Not a Jew", "Music"),
            ],
        )
        .unwrap();

        assert_eq!(list_records(s.conn(), 2).unwrap().len(), 2);
        assert_eq!(search_records(s.conn(), "dyl").unwrap()[0].name, "Bob Dylan");
        assert_eq!(records_by_verdict(s.conn(), "jew").unwrap().len(), 2);
        assert_eq!(records_by_category(s.conn(), "Music").unwrap().len(), 2);
        assert!(get_record(s.conn(), "madonna").unwrap().is_some());
        assert!(get_record(s.conn(), "Nobody").unwrap().is_none());

        let stats = get_stats(s.conn()).unwrap();
        assert_eq!(stats.profiles, 3);
        assert_eq!(stats.pros, 6);
        assert_eq!(stats.cons, 3);
        assert_eq!(stats.verdicts[0], ("Jew".to_string(), 2));
        assert_eq!(stats.categories[0], ("Music".to_string(), 2));
    }

    #[test]
    fn open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.sqlite");
        let mut s = SqliteStore::open(&path).unwrap();
        s.upsert(&record("Test Person", "Jew", "")).unwrap();
        drop(s);

        let s = SqliteStore::open(&path).unwrap();
        assert_eq!(s.load_all().unwrap()[0].name, "Test Person");
    }
}
