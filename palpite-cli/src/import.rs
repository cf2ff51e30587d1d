use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use palpite_db::rusqlite::Connection;
use std::path::Path;
use tracing::warn;

use palpite_db::db::insert_draw;
use palpite_db::models::{Draw, Lottery};

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y")
        .with_context(|| format!("Formato de data inválido: '{}'", raw))
}

fn parse_record(record: &csv::StringRecord, lottery: Lottery) -> Result<Draw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Campo ausente no índice {}", idx))
    };

    let raw_contest = get(0)?;
    let contest = raw_contest
        .parse::<u32>()
        .with_context(|| format!("Concurso inválido: '{}'", raw_contest))?;
    let date = parse_date(&get(1)?)?;

    let expected = 2 + lottery.draw_size();
    if record.len() < expected {
        bail!("{} colunas, esperado pelo menos {}", record.len(), expected);
    }

    let numbers = (2..expected)
        .map(|idx| {
            let s = get(idx)?;
            s.parse::<u8>()
                .with_context(|| format!("Não foi possível ler '{}' (índice {})", s, idx))
        })
        .collect::<Result<Vec<u8>>>()?;

    Draw::new(lottery, contest, date, numbers)
}

#[derive(Debug)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// CSV separado por ';' : concurso; data (dd/mm/aaaa); dezenas...
pub fn import_csv(conn: &Connection, path: &Path, lottery: Lottery) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Não foi possível abrir {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Não foi possível iniciar a transação")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => {
                match parse_record(&record, lottery) {
                    Ok(draw) => {
                        match insert_draw(&tx, &draw) {
                            Ok(true) => result.inserted += 1,
                            Ok(false) => result.skipped += 1,
                            Err(e) => {
                                warn!("Erro ao inserir a linha {}: {}", result.total_records, e);
                                result.errors += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Erro ao interpretar a linha {}: {:#}", result.total_records, e);
                        result.errors += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Erro de leitura na linha {}: {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Falha no commit")?;
    Ok(result)
}
