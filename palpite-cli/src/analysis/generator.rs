use std::collections::HashSet;

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use tracing::debug;

use palpite_db::models::{Game, LotteryStatistics, Strategy};

const ATTEMPTS_PER_GAME: usize = 100;
const POOL_BOOST: f64 = 3.0;
const MAX_PREALLOC: usize = 1024;

fn hot_weights(stats: &LotteryStatistics) -> Vec<f64> {
    stats
        .numbers
        .iter()
        .map(|s| {
            let w = 1.0 + s.frequency as f64;
            if stats.hot.contains(&s.number) { w * POOL_BOOST } else { w }
        })
        .collect()
}

fn cold_weights(stats: &LotteryStatistics) -> Vec<f64> {
    let max_freq = stats.numbers.iter().map(|s| s.frequency).max().unwrap_or(0);
    stats
        .numbers
        .iter()
        .map(|s| {
            let w = 1.0 + (max_freq - s.frequency) as f64;
            if stats.cold.contains(&s.number) { w * POOL_BOOST } else { w }
        })
        .collect()
}

/// Pesos por dezena, na ordem de `stats.numbers`. A estratégia equilibrada
/// alterna as duas listas, uma por sorteio.
pub fn strategy_weights(stats: &LotteryStatistics, strategy: Strategy) -> Vec<Vec<f64>> {
    match strategy {
        Strategy::Hot => vec![hot_weights(stats)],
        Strategy::Cold => vec![cold_weights(stats)],
        Strategy::Random => vec![vec![1.0; stats.numbers.len()]],
        Strategy::Balanced => vec![hot_weights(stats), cold_weights(stats)],
    }
}

pub fn generate_games(
    stats: &LotteryStatistics,
    strategy: Strategy,
    size: usize,
    count: usize,
    seed: Option<u64>,
) -> Result<Vec<Game>> {
    let lottery = stats.lottery;
    if size < lottery.min_pick() || size > lottery.max_pick() {
        bail!(
            "Um jogo da {} tem de {} a {} dezenas (pedido : {})",
            lottery,
            lottery.min_pick(),
            lottery.max_pick(),
            size
        );
    }

    let mut rng: StdRng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let weights = strategy_weights(stats, strategy);
    let numbers: Vec<u8> = stats.numbers.iter().map(|s| s.number).collect();

    let Some(max_attempts) = count.checked_mul(ATTEMPTS_PER_GAME) else {
        bail!("Número de jogos grande demais : {}", count);
    };
    let mut seen: HashSet<Vec<u8>> = HashSet::with_capacity(count.min(MAX_PREALLOC));
    let mut games = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut attempts = 0;

    while games.len() < count {
        if attempts >= max_attempts {
            bail!(
                "Apenas {} jogos distintos gerados após {} tentativas (pedido : {})",
                games.len(),
                attempts,
                count
            );
        }
        attempts += 1;

        let (mut picked, score) = sample_without_replacement(&numbers, &weights, size, &mut rng)?;
        picked.sort();
        if seen.insert(picked.clone()) {
            games.push(Game { numbers: picked, score });
        }
    }
    debug!("{} jogos gerados em {} tentativas", games.len(), attempts);

    games.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    Ok(games)
}

/// Sorteio ponderado sem reposição. O score é o produto de peso/peso médio
/// de cada dezena retirada.
fn sample_without_replacement(
    numbers: &[u8],
    weights: &[Vec<f64>],
    count: usize,
    rng: &mut StdRng,
) -> Result<(Vec<u8>, f64)> {
    let mut available: Vec<usize> = (0..numbers.len()).collect();
    let mut selected = Vec::with_capacity(count);
    let mut score = 1.0f64;

    for pick in 0..count {
        let table = &weights[pick % weights.len()];
        let mean = table.iter().sum::<f64>() / table.len() as f64;

        let current: Vec<f64> = available.iter().map(|&i| table[i]).collect();
        let dist = WeightedIndex::new(&current)?;
        let pos = dist.sample(rng);

        let idx = available.remove(pos);
        selected.push(numbers[idx]);
        score *= table[idx] / mean;
    }

    Ok((selected, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, make_test_draws};
    use palpite_db::models::{Lottery, validate_game};

    fn stats_for(lottery: Lottery) -> LotteryStatistics {
        analyze(&make_test_draws(lottery, 50), lottery, 10)
    }

    #[test]
    fn test_games_are_valid() {
        for lottery in Lottery::ALL {
            let stats = stats_for(lottery);
            for strategy in [Strategy::Hot, Strategy::Cold, Strategy::Balanced, Strategy::Random] {
                let games = generate_games(&stats, strategy, lottery.min_pick(), 5, Some(42)).unwrap();
                assert_eq!(games.len(), 5);
                for game in &games {
                    assert!(validate_game(lottery, &game.numbers).is_ok(), "{:?}", game.numbers);
                    assert!(game.numbers.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }

    #[test]
    fn test_games_are_distinct() {
        let stats = stats_for(Lottery::MegaSena);
        let games = generate_games(&stats, Strategy::Balanced, 6, 30, Some(7)).unwrap();
        let unique: HashSet<Vec<u8>> = games.iter().map(|g| g.numbers.clone()).collect();
        assert_eq!(unique.len(), 30);
    }

    #[test]
    fn test_size_out_of_bounds() {
        let stats = stats_for(Lottery::MegaSena);
        assert!(generate_games(&stats, Strategy::Hot, 5, 1, Some(1)).is_err());
        assert!(generate_games(&stats, Strategy::Hot, 21, 1, Some(1)).is_err());
        assert!(generate_games(&stats, Strategy::Hot, 20, 1, Some(1)).is_ok());
    }

    #[test]
    fn test_seed_determinism() {
        let stats = stats_for(Lottery::Quina);
        let g1 = generate_games(&stats, Strategy::Hot, 5, 5, Some(123)).unwrap();
        let g2 = generate_games(&stats, Strategy::Hot, 5, 5, Some(123)).unwrap();
        for (a, b) in g1.iter().zip(g2.iter()) {
            assert_eq!(a.numbers, b.numbers);
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_sorted_by_score() {
        let stats = stats_for(Lottery::MegaSena);
        let games = generate_games(&stats, Strategy::Hot, 6, 10, Some(5)).unwrap();
        assert!(games.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_exhausted_combinations_error() {
        // 20 dezenas disponíveis para um jogo de 20 : uma única combinação
        let lottery = Lottery::Lotofacil;
        let mut stats = stats_for(lottery);
        stats.numbers.truncate(20);
        let games = generate_games(&stats, Strategy::Random, 20, 2, Some(3));
        assert!(games.is_err(), "apenas uma combinação possível");
    }

    #[test]
    fn test_huge_count_is_rejected() {
        let stats = stats_for(Lottery::MegaSena);
        let games = generate_games(&stats, Strategy::Hot, 6, usize::MAX / 50, Some(1));
        assert!(games.is_err());
    }

    #[test]
    fn test_hot_strategy_favors_hot_numbers() {
        let stats = stats_for(Lottery::MegaSena);
        let games = generate_games(&stats, Strategy::Hot, 6, 200, Some(11)).unwrap();
        let hot_hits: usize = games
            .iter()
            .map(|g| g.numbers.iter().filter(|n| stats.hot.contains(n)).count())
            .sum();
        let cold_hits: usize = games
            .iter()
            .map(|g| g.numbers.iter().filter(|n| stats.cold.contains(n)).count())
            .sum();
        assert!(hot_hits > cold_hits, "quentes={} frias={}", hot_hits, cold_hits);
    }

    #[test]
    fn test_balanced_alternates_tables() {
        let stats = stats_for(Lottery::Quina);
        let tables = strategy_weights(&stats, Strategy::Balanced);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].len(), Lottery::Quina.pool_size());
        assert!(tables.iter().flatten().all(|&w| w > 0.0));
    }
}
