pub mod generator;

use palpite_db::models::{Draw, Lottery, LotteryStatistics, NumberStats};

/// Frequência e atraso de cada dezena na janela. draws[0] = concurso mais recente.
pub fn compute_stats(draws: &[Draw], lottery: Lottery) -> Vec<NumberStats> {
    let mut stats: Vec<NumberStats> = lottery
        .numbers()
        .map(|n| NumberStats {
            number: n,
            frequency: 0,
            gap: 0,
        })
        .collect();
    let mut seen = vec![false; stats.len()];

    for (i, draw) in draws.iter().enumerate() {
        for &n in &draw.numbers {
            if let Some(idx) = lottery.index_of(n) {
                stats[idx].frequency += 1;
                if !seen[idx] {
                    seen[idx] = true;
                    stats[idx].gap = i as u32;
                }
            }
        }
    }

    for (stat, &was_seen) in stats.iter_mut().zip(seen.iter()) {
        if !was_seen {
            stat.gap = draws.len() as u32;
        }
    }

    stats
}

/// Partição quentes/frias. Empates resolvidos pela menor dezena; as frias
/// nunca repetem uma dezena já quente.
pub fn hot_cold(stats: &[NumberStats], count: usize) -> (Vec<u8>, Vec<u8>) {
    let mut by_freq = stats.to_vec();
    by_freq.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));
    let hot: Vec<u8> = by_freq.iter().take(count).map(|s| s.number).collect();

    by_freq.sort_by(|a, b| a.frequency.cmp(&b.frequency).then(a.number.cmp(&b.number)));
    let cold: Vec<u8> = by_freq
        .iter()
        .filter(|s| !hot.contains(&s.number))
        .take(count)
        .map(|s| s.number)
        .collect();

    (hot, cold)
}

pub fn analyze(draws: &[Draw], lottery: Lottery, hot_count: usize) -> LotteryStatistics {
    let numbers = compute_stats(draws, lottery);
    let (hot, cold) = hot_cold(&numbers, hot_count);

    let (average_sum, average_even) = if draws.is_empty() {
        (0.0, 0.0)
    } else {
        let n = draws.len() as f64;
        let sum: f64 = draws
            .iter()
            .map(|d| d.numbers.iter().map(|&x| x as f64).sum::<f64>())
            .sum();
        let even: usize = draws
            .iter()
            .map(|d| d.numbers.iter().filter(|&&x| x % 2 == 0).count())
            .sum();
        (sum / n, even as f64 / n)
    };

    LotteryStatistics {
        lottery,
        draws_analyzed: draws.len(),
        numbers,
        hot,
        cold,
        average_sum,
        average_even,
    }
}

pub fn count_hits(game: &[u8], draw: &Draw) -> usize {
    game.iter().filter(|n| draw.numbers.contains(n)).count()
}

#[cfg(test)]
pub(crate) fn make_test_draws(lottery: Lottery, n: usize) -> Vec<Draw> {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
    (0..n)
        .map(|i| {
            let span = lottery.pool_size();
            let numbers: Vec<u8> = (0..lottery.draw_size())
                .map(|k| lottery.min_number() + ((i * 3 + k) % span) as u8)
                .collect();
            Draw::new(lottery, (n - i) as u32, date, numbers).unwrap()
        })
        .collect()
}
