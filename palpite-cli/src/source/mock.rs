use chrono::{Days, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use palpite_db::models::{Draw, Lottery};

pub const MOCK_HISTORY: usize = 100;

const FIRST_CONTEST: u32 = 3000;
const DRAW_INTERVAL_DAYS: u64 = 3;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default()
}

fn lottery_seed(lottery: Lottery) -> u64 {
    lottery
        .slug()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3))
}

/// Histórico simulado e determinístico, mais recente primeiro.
pub fn mock_draws(lottery: Lottery, n: usize) -> Vec<Draw> {
    let mut rng = StdRng::seed_from_u64(lottery_seed(lottery));
    let last_date = base_date();

    (0..n)
        .map(|i| {
            let mut numbers: Vec<u8> = sample(&mut rng, lottery.pool_size(), lottery.draw_size())
                .into_iter()
                .map(|idx| lottery.min_number() + idx as u8)
                .collect();
            numbers.sort();
            Draw {
                lottery,
                contest: FIRST_CONTEST.saturating_sub(i as u32),
                date: last_date
                    .checked_sub_days(Days::new(i as u64 * DRAW_INTERVAL_DAYS))
                    .unwrap_or(last_date),
                numbers,
            }
        })
        .collect()
}
