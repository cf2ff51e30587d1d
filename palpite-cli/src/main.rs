mod analysis;
mod config;
mod display;
mod import;
mod source;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::generator::generate_games;
use crate::analysis::{analyze, count_hits};
use crate::config::{AppConfig, CONFIG_FILE, load_config};
use crate::display::{
    display_check, display_draws, display_games, display_import_summary, display_origin,
    display_saved_games, display_stats, display_sync_summary,
};
use crate::source::{Origin, ResultsClient, mock, refresh_if_stale, sync_lottery};
use palpite_db::db::{
    count_draws, db_path, delete_saved_game, fetch_last_draws, fetch_saved_games, insert_draw,
    insert_saved_game, migrate, open_db,
};
use palpite_db::models::{Draw, GameSource, Lottery, Strategy, validate_draw, validate_game};
use palpite_db::rusqlite::Connection;

const MAX_GAMES: i64 = 1000;

#[derive(Parser)]
#[command(name = "palpite", about = "Análise de resultados das loterias da Caixa")]
struct Cli {
    /// Arquivo de configuração JSON
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Logs detalhados
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mostrar o caminho da base de dados
    DbPath,

    /// Baixar os resultados da API (todas as loterias se nenhuma for indicada)
    Sync {
        #[arg(short, long)]
        lottery: Option<Lottery>,
    },

    /// Importar concursos de um arquivo CSV
    Import {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,

        /// Caminho do arquivo CSV
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Cadastrar um concurso manualmente
    Add {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,
    },

    /// Listar os últimos concursos
    List {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,

        /// Número de concursos
        #[arg(long, default_value = "10")]
        last: u32,
    },

    /// Frequências, atrasos e dezenas quentes/frias
    Stats {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,

        /// Janela de análise (número de concursos)
        #[arg(short, long)]
        window: Option<u32>,

        /// Quantidade de dezenas quentes e frias
        #[arg(long)]
        hot: Option<usize>,
    },

    /// Gerar jogos a partir do histórico
    Generate {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,

        #[arg(short, long, default_value = "balanced")]
        strategy: Strategy,

        /// Dezenas por jogo (padrão: mínimo da loteria)
        #[arg(long)]
        size: Option<usize>,

        /// Número de jogos
        #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=MAX_GAMES))]
        count: u32,

        /// Janela de análise (número de concursos)
        #[arg(short, long)]
        window: Option<u32>,

        /// Seed para reprodutibilidade
        #[arg(long)]
        seed: Option<u64>,

        /// Salvar os jogos gerados
        #[arg(long)]
        save: bool,
    },

    /// Listar os jogos salvos
    Games {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,
    },

    /// Salvar um jogo manual
    Save {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,

        numbers: Vec<u8>,
    },

    /// Remover um jogo salvo
    Delete {
        id: i64,
    },

    /// Conferir um jogo contra os últimos concursos
    Check {
        #[arg(short, long, default_value = "megasena")]
        lottery: Lottery,

        #[arg(long, default_value = "10")]
        last: u32,

        numbers: Vec<u8>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli.config)?;
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::Sync { lottery } => cmd_sync(&conn, &config, lottery),
        Command::Import { lottery, file } => cmd_import(&conn, &file, lottery),
        Command::Add { lottery } => cmd_add(&conn, lottery),
        Command::List { lottery, last } => cmd_list(&conn, lottery, last),
        Command::Stats { lottery, window, hot } => cmd_stats(&conn, &config, lottery, window, hot),
        Command::Generate {
            lottery,
            strategy,
            size,
            count,
            window,
            seed,
            save,
        } => cmd_generate(&conn, &config, lottery, strategy, size, count, window, seed, save),
        Command::Games { lottery } => {
            display_saved_games(&fetch_saved_games(&conn, lottery)?);
            Ok(())
        }
        Command::Save { lottery, numbers } => cmd_save(&conn, lottery, numbers),
        Command::Delete { id } => {
            if delete_saved_game(&conn, id)? {
                println!("Jogo {} removido.", id);
            } else {
                println!("Jogo {} não encontrado.", id);
            }
            Ok(())
        }
        Command::Check { lottery, last, numbers } => cmd_check(&conn, &config, lottery, last, numbers),
    }
}

/// Concursos da janela, atualizando a base antes se estiver desatualizada.
/// Sem nada gravado e sem API, usa o histórico simulado.
fn load_window(conn: &Connection, config: &AppConfig, lottery: Lottery, window: u32) -> Result<(Vec<Draw>, Origin)> {
    let client = ResultsClient::new(config)?;
    if let Some(outcome) = refresh_if_stale(conn, &client, lottery, config)? {
        info!("Base da {} atualizada : {} novos concursos", lottery, outcome.inserted);
    }

    let n = count_draws(conn, lottery)?;
    if n == 0 {
        warn!("Nenhum concurso da {} na base", lottery);
        let mut draws = mock::mock_draws(lottery, mock::MOCK_HISTORY);
        draws.truncate(window as usize);
        return Ok((draws, Origin::Mock));
    }

    Ok((fetch_last_draws(conn, lottery, window.min(n))?, Origin::Live))
}

fn cmd_sync(conn: &Connection, config: &AppConfig, lottery: Option<Lottery>) -> Result<()> {
    let client = ResultsClient::new(config)?;
    let lotteries: Vec<Lottery> = match lottery {
        Some(l) => vec![l],
        None => Lottery::ALL.to_vec(),
    };

    let pb = ProgressBar::new(lotteries.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .context("Template de progresso inválido")?
        .progress_chars("=> "));

    let mut outcomes = Vec::with_capacity(lotteries.len());
    for l in lotteries {
        pb.set_message(l.name());
        let outcome = sync_lottery(conn, &client, l, true)?;
        outcomes.push((l, outcome));
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (l, outcome) in &outcomes {
        print!("{:<13} ", l.name());
        display_sync_summary(outcome);
    }
    Ok(())
}

fn cmd_import(conn: &Connection, file: &Path, lottery: Lottery) -> Result<()> {
    let result = import::import_csv(conn, file, lottery)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, lottery: Lottery, last: u32) -> Result<()> {
    let n = count_draws(conn, lottery)?;
    if n == 0 {
        println!("Base vazia. Rode antes : palpite sync -l {}", lottery.slug());
        return Ok(());
    }
    let draws = fetch_last_draws(conn, lottery, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(
    conn: &Connection,
    config: &AppConfig,
    lottery: Lottery,
    window: Option<u32>,
    hot: Option<usize>,
) -> Result<()> {
    let window = window.unwrap_or(config.default_window);
    let (draws, origin) = load_window(conn, config, lottery, window)?;
    display_origin(origin);

    let stats = analyze(&draws, lottery, hot.unwrap_or(config.hot_count));
    display_stats(&stats);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_generate(
    conn: &Connection,
    config: &AppConfig,
    lottery: Lottery,
    strategy: Strategy,
    size: Option<usize>,
    count: u32,
    window: Option<u32>,
    seed: Option<u64>,
    save: bool,
) -> Result<()> {
    let window = window.unwrap_or(config.default_window);
    let (draws, origin) = load_window(conn, config, lottery, window)?;
    display_origin(origin);

    let stats = analyze(&draws, lottery, config.hot_count);
    let size = size.unwrap_or(lottery.min_pick());
    let games = generate_games(&stats, strategy, size, count as usize, seed)?;
    display_games(&games, strategy);

    if save {
        for game in &games {
            insert_saved_game(conn, lottery, &game.numbers, Some(strategy), GameSource::Generator)?;
        }
        println!("{} jogos salvos.", games.len());
    }
    Ok(())
}

fn cmd_save(conn: &Connection, lottery: Lottery, mut numbers: Vec<u8>) -> Result<()> {
    validate_game(lottery, &numbers)?;
    numbers.sort();
    let id = insert_saved_game(conn, lottery, &numbers, None, GameSource::Manual)?;
    println!("Jogo salvo com o id {}.", id);
    Ok(())
}

fn cmd_check(
    conn: &Connection,
    config: &AppConfig,
    lottery: Lottery,
    last: u32,
    mut numbers: Vec<u8>,
) -> Result<()> {
    validate_game(lottery, &numbers)?;
    numbers.sort();

    let (draws, origin) = load_window(conn, config, lottery, last)?;
    display_origin(origin);

    let results: Vec<(Draw, usize)> = draws
        .into_iter()
        .map(|d| {
            let hits = count_hits(&numbers, &d);
            (d, hits)
        })
        .collect();
    display_check(&numbers, &results);
    Ok(())
}

fn cmd_add(conn: &Connection, lottery: Lottery) -> Result<()> {
    println!("Cadastro manual de concurso da {}\n", lottery);

    let raw_contest = prompt("Número do concurso (ex: 2750) : ")?;
    let contest = raw_contest
        .parse::<u32>()
        .with_context(|| format!("Concurso inválido : '{}'", raw_contest))?;
    let date = import::parse_date(&prompt("Data (DD/MM/AAAA) : ")?)?;
    let numbers = prompt_numbers(lottery)?;

    let draw = Draw::new(lottery, contest, date, numbers)?;

    println!("\nConcurso a inserir :");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirmar a inserção ? (s/n) : ")?;
    if confirm.trim().to_lowercase() == "s" {
        let inserted = insert_draw(conn, &draw)?;
        if inserted {
            println!("Concurso inserido com sucesso.");
        } else {
            println!("Esse concurso já existe (duplicado ignorado).");
        }
    } else {
        println!("Inserção cancelada.");
    }

    Ok(())
}

fn read_answer(reader: &mut impl BufRead) -> Result<String> {
    let mut input = String::new();
    let n = reader.read_line(&mut input).context("Erro de leitura")?;
    if n == 0 {
        bail!("Entrada encerrada");
    }
    Ok(input.trim().to_string())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

fn prompt_numbers(lottery: Lottery) -> Result<Vec<u8>> {
    let msg = format!(
        "{} dezenas (separadas por espaço, {}-{}) : ",
        lottery.draw_size(),
        lottery.min_number(),
        lottery.max_number()
    );
    loop {
        let input = prompt(&msg)?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) => match validate_draw(lottery, &v) {
                Ok(()) => return Ok(v),
                Err(e) => println!("{}. Tente de novo.", e),
            },
            Err(_) => println!("Digite apenas números. Tente de novo."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_answer_trims() {
        let mut input = io::Cursor::new("  04 08 15 \n");
        assert_eq!(read_answer(&mut input).unwrap(), "04 08 15");
    }

    #[test]
    fn test_read_answer_stops_at_eof() {
        let mut input = io::Cursor::new("s\n");
        assert_eq!(read_answer(&mut input).unwrap(), "s");
        assert!(read_answer(&mut input).is_err());
    }
}
