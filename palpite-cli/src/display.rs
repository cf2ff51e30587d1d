use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use crate::source::{Origin, SyncOutcome};
use palpite_db::models::{Draw, Game, LotteryStatistics, NumberTag, SavedGame, Strategy, format_numbers};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_origin(origin: Origin) {
    if origin == Origin::Mock {
        println!("⚠️  API indisponível : análise feita sobre dados simulados.\n");
    }
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Nenhum concurso para exibir.");
        return;
    }

    let mut table = new_table(vec!["Concurso", "Data", "Dezenas"]);
    for draw in draws {
        table.add_row(vec![
            draw.contest.to_string(),
            draw.date.format("%d/%m/%Y").to_string(),
            format_numbers(&draw.numbers),
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Importação concluída :");
    println!("  Linhas lidas        : {}", result.total_records);
    println!("  Inseridos           : {}", result.inserted);
    println!("  Duplicados ignorados: {}", result.skipped);
    if result.errors > 0 {
        println!("  Erros               : {}", result.errors);
    }
}

pub fn display_sync_summary(outcome: &SyncOutcome) {
    match outcome.origin {
        Origin::Live => println!(
            "Sincronização concluída : {} concursos recebidos, {} novos.",
            outcome.received, outcome.inserted
        ),
        Origin::Mock => println!("API indisponível : nada foi gravado."),
    }
}

fn tag_cell(tag: NumberTag) -> Cell {
    let color = match tag {
        NumberTag::Hot => Color::Red,
        NumberTag::Cold => Color::Cyan,
        NumberTag::Normal => Color::White,
    };
    Cell::new(tag.to_string()).fg(color)
}

pub fn display_stats(stats: &LotteryStatistics) {
    println!(
        "\n📊 {} : estatísticas dos últimos {} concursos\n",
        stats.lottery, stats.draws_analyzed
    );

    let mut table = new_table(vec!["Dezena", "Frequência", "Atraso", "Tag"]);

    let mut sorted = stats.numbers.clone();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));

    for stat in &sorted {
        table.add_row(vec![
            Cell::new(format!("{:02}", stat.number)),
            Cell::new(stat.frequency),
            Cell::new(stat.gap),
            tag_cell(stats.tag_for(stat.number)),
        ]);
    }
    println!("{table}");

    println!("\n🔥 Quentes : {}", format_numbers(&stats.hot));
    println!("❄️  Frias   : {}", format_numbers(&stats.cold));
    println!("Soma média das dezenas : {:.1}", stats.average_sum);
    println!("Média de pares por concurso : {:.2}", stats.average_even);
}

pub fn display_games(games: &[Game], strategy: Strategy) {
    println!("\n🎲 Jogos sugeridos (estratégia {strategy})\n");

    let mut table = new_table(vec!["#", "Dezenas", "Score"]);
    for (i, game) in games.iter().enumerate() {
        table.add_row(vec![
            format!("{}", i + 1),
            format_numbers(&game.numbers),
            format!("{:.4}", game.score),
        ]);
    }
    println!("{table}");
}

pub fn display_saved_games(games: &[SavedGame]) {
    if games.is_empty() {
        println!("Nenhum jogo salvo.");
        return;
    }

    let mut table = new_table(vec!["Id", "Dezenas", "Estratégia", "Origem", "Criado em"]);
    for game in games {
        table.add_row(vec![
            game.id.to_string(),
            format_numbers(&game.numbers),
            game.strategy.map(|s| s.to_string()).unwrap_or_else(|| "—".to_string()),
            game.source.as_str().to_string(),
            game.created_at.format("%d/%m/%Y %H:%M").to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_check(game: &[u8], results: &[(Draw, usize)]) {
    println!("\nConferência de {}\n", format_numbers(game));

    let mut table = new_table(vec!["Concurso", "Data", "Dezenas", "Acertos"]);
    for (draw, hits) in results {
        let color = if *hits >= draw.lottery.min_prize_hits() {
            Color::Green
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new(draw.contest),
            Cell::new(draw.date.format("%d/%m/%Y")),
            Cell::new(format_numbers(&draw.numbers)),
            Cell::new(hits).fg(color),
        ]);
    }
    println!("{table}");

    if let Some(best) = results.iter().map(|(_, h)| *h).max() {
        println!("Melhor resultado : {} acertos", best);
    }
}
