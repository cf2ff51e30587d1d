pub mod mock;

#[cfg(test)]
mod http_tests;

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use palpite_db::db::{count_draws, earliest_contest, insert_draw, last_sync, latest_contest, record_sync};
use palpite_db::models::{Draw, Lottery};
use palpite_db::rusqlite::Connection;

use crate::config::AppConfig;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("falha na requisição HTTP : {0}")]
    Http(#[from] reqwest::Error),

    #[error("a API respondeu {status} para {url}")]
    Status { status: u16, url: String },

    #[error("resposta JSON inválida : {0}")]
    Json(#[from] serde_json::Error),

    #[error("nenhum concurso válido retornado para {lottery}")]
    NoData { lottery: Lottery },
}

/// Registro bruto da API de resultados.
#[derive(Debug, Deserialize)]
pub struct ApiDraw {
    pub concurso: u32,
    pub data: String,
    pub dezenas: Vec<String>,
}

impl ApiDraw {
    pub fn into_draw(self, lottery: Lottery) -> anyhow::Result<Draw> {
        let date = NaiveDate::parse_from_str(self.data.trim(), "%d/%m/%Y")
            .map_err(|e| anyhow::anyhow!("data inválida '{}' : {}", self.data, e))?;
        let numbers = self
            .dezenas
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<u8>()
                    .map_err(|e| anyhow::anyhow!("dezena inválida '{}' : {}", s, e))
            })
            .collect::<anyhow::Result<Vec<u8>>>()?;
        Draw::new(lottery, self.concurso, date, numbers)
    }
}

fn convert_record(lottery: Lottery, value: Value) -> anyhow::Result<Draw> {
    let record: ApiDraw = serde_json::from_value(value)?;
    record.into_draw(lottery)
}

/// Converte os registros, descartando os malformados. Mais recente primeiro.
pub fn convert_records(lottery: Lottery, records: Vec<Value>) -> Vec<Draw> {
    let mut draws: Vec<Draw> = records
        .into_iter()
        .filter_map(|value| {
            let contest = value.get("concurso").cloned().unwrap_or(Value::Null);
            match convert_record(lottery, value) {
                Ok(draw) => Some(draw),
                Err(e) => {
                    warn!("Concurso {} da {} ignorado : {}", contest, lottery, e);
                    None
                }
            }
        })
        .collect();
    draws.sort_by(|a, b| b.contest.cmp(&a.contest));
    draws
}

pub struct ResultsClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ResultsClient {
    pub fn new(config: &AppConfig) -> SourceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("palpite/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_text(&self, url: &str) -> SourceResult<String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text()?)
    }

    /// Histórico completo da loteria.
    pub fn fetch_all(&self, lottery: Lottery) -> SourceResult<Vec<Draw>> {
        let url = format!("{}/{}", self.base_url, lottery.slug());
        let body = self.get_text(&url)?;
        let records: Vec<Value> = serde_json::from_str(&body)?;
        let draws = convert_records(lottery, records);
        if draws.is_empty() {
            return Err(SourceError::NoData { lottery });
        }
        Ok(draws)
    }

    pub fn fetch_latest(&self, lottery: Lottery) -> SourceResult<Draw> {
        let url = format!("{}/{}/latest", self.base_url, lottery.slug());
        let body = self.get_text(&url)?;
        let record: Value = serde_json::from_str(&body)?;
        convert_records(lottery, vec![record])
            .into_iter()
            .next()
            .ok_or(SourceError::NoData { lottery })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Live,
    Mock,
}

/// Busca o histórico na API; em caso de falha devolve dados simulados.
pub fn load_draws(client: &ResultsClient, lottery: Lottery) -> (Vec<Draw>, Origin) {
    match client.fetch_all(lottery) {
        Ok(draws) => {
            info!("{} concursos da {} recebidos", draws.len(), lottery);
            (draws, Origin::Live)
        }
        Err(e) => {
            warn!("API indisponível para a {} ({}), usando dados simulados", lottery, e);
            (mock::mock_draws(lottery, mock::MOCK_HISTORY), Origin::Mock)
        }
    }
}

pub fn is_stale(conn: &Connection, lottery: Lottery, stale_after_hours: u64) -> anyhow::Result<bool> {
    let stale = match last_sync(conn, lottery)? {
        Some(at) => {
            let age = Utc::now().naive_utc() - at;
            age.num_hours() >= i64::try_from(stale_after_hours).unwrap_or(i64::MAX)
        }
        None => true,
    };
    Ok(stale)
}

pub struct SyncOutcome {
    pub origin: Origin,
    pub received: usize,
    pub inserted: usize,
}

/// Concursos 1..=último todos gravados.
fn has_full_history(conn: &Connection, lottery: Lottery) -> anyhow::Result<Option<u32>> {
    let (Some(first), Some(last)) = (earliest_contest(conn, lottery)?, latest_contest(conn, lottery)?) else {
        return Ok(None);
    };
    let stored = count_draws(conn, lottery)?;
    if first == 1 && stored == last {
        Ok(Some(last))
    } else {
        debug!("Histórico da {} incompleto : {} concursos entre {} e {}", lottery, stored, first, last);
        Ok(None)
    }
}

/// Grava os concursos recebidos da API. Dados simulados nunca são gravados.
/// Sem `force`, quando a base já tem o histórico completo até o último
/// concurso da API, o histórico não é baixado de novo.
pub fn sync_lottery(
    conn: &Connection,
    client: &ResultsClient,
    lottery: Lottery,
    force: bool,
) -> anyhow::Result<SyncOutcome> {
    let complete = if force { None } else { has_full_history(conn, lottery)? };
    if let Some(stored) = complete {
        match client.fetch_latest(lottery) {
            Ok(latest) if latest.contest <= stored => {
                debug!("{} já está no concurso {}", lottery, stored);
                record_sync(conn, lottery, Utc::now().naive_utc())?;
                return Ok(SyncOutcome {
                    origin: Origin::Live,
                    received: 1,
                    inserted: 0,
                });
            }
            Ok(latest) => debug!("{} : concurso {} disponível, base em {}", lottery, latest.contest, stored),
            Err(e) => debug!("Último concurso da {} indisponível : {}", lottery, e),
        }
    }

    let (draws, origin) = load_draws(client, lottery);
    let mut inserted = 0;
    if origin == Origin::Live {
        let tx = conn.unchecked_transaction()?;
        for draw in &draws {
            if insert_draw(&tx, draw)? {
                inserted += 1;
            }
        }
        record_sync(&tx, lottery, Utc::now().naive_utc())?;
        tx.commit()?;
    }
    Ok(SyncOutcome {
        origin,
        received: draws.len(),
        inserted,
    })
}

/// Atualiza a base local quando a última sincronização passou do prazo.
pub fn refresh_if_stale(
    conn: &Connection,
    client: &ResultsClient,
    lottery: Lottery,
    config: &AppConfig,
) -> anyhow::Result<Option<SyncOutcome>> {
    if !is_stale(conn, lottery, config.stale_after_hours)? {
        debug!("Base da {} ainda válida", lottery);
        return Ok(None);
    }
    sync_lottery(conn, client, lottery, false).map(Some)
}
