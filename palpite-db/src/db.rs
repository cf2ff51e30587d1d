use anyhow::{Context, Result, bail};
use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

use crate::models::{Draw, GameSource, Lottery, SavedGame, Strategy};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    lottery  TEXT NOT NULL,
    contest  INTEGER NOT NULL,
    date     TEXT NOT NULL,
    numbers  TEXT NOT NULL,
    PRIMARY KEY (lottery, contest)
);

CREATE TABLE IF NOT EXISTS saved_games (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    lottery     TEXT NOT NULL,
    numbers     TEXT NOT NULL,
    strategy    TEXT,
    source      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_log (
    lottery    TEXT PRIMARY KEY,
    synced_at  TEXT NOT NULL
);
";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("palpite.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Não foi possível criar o diretório {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Não foi possível abrir a base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Falha na migração")?;
    Ok(())
}

fn encode_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split_whitespace()
        .map(|s| {
            s.parse::<u8>()
                .with_context(|| format!("Dezena inválida na base: '{}'", s))
        })
        .collect()
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (lottery, contest, date, numbers)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            draw.lottery.slug(),
            draw.contest,
            draw.date,
            encode_numbers(&draw.numbers),
        ],
    ).context("Falha na inserção do concurso")?;
    Ok(changed > 0)
}

/// Concursos mais recentes primeiro.
pub fn fetch_last_draws(conn: &Connection, lottery: Lottery, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT contest, date, numbers
         FROM draws WHERE lottery = ?1 ORDER BY contest DESC LIMIT ?2"
    )?;
    let rows = stmt.query_map(rusqlite::params![lottery.slug(), limit], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, chrono::NaiveDate>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(contest, date, raw)| {
            Ok(Draw {
                lottery,
                contest,
                date,
                numbers: decode_numbers(&raw)?,
            })
        })
        .collect()
}

pub fn count_draws(conn: &Connection, lottery: Lottery) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM draws WHERE lottery = ?1",
        [lottery.slug()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn latest_contest(conn: &Connection, lottery: Lottery) -> Result<Option<u32>> {
    let contest: Option<u32> = conn.query_row(
        "SELECT MAX(contest) FROM draws WHERE lottery = ?1",
        [lottery.slug()],
        |row| row.get(0),
    )?;
    Ok(contest)
}

pub fn earliest_contest(conn: &Connection, lottery: Lottery) -> Result<Option<u32>> {
    let contest: Option<u32> = conn.query_row(
        "SELECT MIN(contest) FROM draws WHERE lottery = ?1",
        [lottery.slug()],
        |row| row.get(0),
    )?;
    Ok(contest)
}

pub fn record_sync(conn: &Connection, lottery: Lottery, at: NaiveDateTime) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_log (lottery, synced_at) VALUES (?1, ?2)
         ON CONFLICT(lottery) DO UPDATE SET synced_at = excluded.synced_at",
        rusqlite::params![lottery.slug(), at],
    ).context("Falha ao registrar a sincronização")?;
    Ok(())
}

pub fn last_sync(conn: &Connection, lottery: Lottery) -> Result<Option<NaiveDateTime>> {
    let mut stmt = conn.prepare("SELECT synced_at FROM sync_log WHERE lottery = ?1")?;
    let mut rows = stmt.query_map([lottery.slug()], |row| row.get::<_, NaiveDateTime>(0))?;
    match rows.next() {
        Some(at) => Ok(Some(at?)),
        None => Ok(None),
    }
}

pub fn insert_saved_game(
    conn: &Connection,
    lottery: Lottery,
    numbers: &[u8],
    strategy: Option<Strategy>,
    source: GameSource,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO saved_games (lottery, numbers, strategy, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            lottery.slug(),
            encode_numbers(numbers),
            strategy.map(|s| s.as_str()),
            source.as_str(),
            Utc::now().naive_utc(),
        ],
    ).context("Falha ao salvar o jogo")?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_saved_games(conn: &Connection, lottery: Lottery) -> Result<Vec<SavedGame>> {
    let mut stmt = conn.prepare(
        "SELECT id, numbers, strategy, source, created_at
         FROM saved_games WHERE lottery = ?1 ORDER BY id DESC"
    )?;
    let rows = stmt.query_map([lottery.slug()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, NaiveDateTime>(4)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, raw, strategy, source, created_at)| {
            let source = match GameSource::parse(&source) {
                Some(s) => s,
                None => bail!("Origem de jogo desconhecida : '{}'", source),
            };
            Ok(SavedGame {
                id,
                lottery,
                numbers: decode_numbers(&raw)?,
                strategy: strategy.as_deref().and_then(Strategy::parse),
                source,
                created_at,
            })
        })
        .collect()
}

pub fn delete_saved_game(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM saved_games WHERE id = ?1", [id])
        .context("Falha ao remover o jogo")?;
    Ok(changed > 0)
}
