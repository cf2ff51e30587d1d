use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Lottery {
    #[value(name = "megasena")]
    MegaSena,
    Lotofacil,
    Quina,
    Lotomania,
    Timemania,
    #[value(name = "diadesorte")]
    DiaDeSorte,
}

impl Lottery {
    pub const ALL: [Lottery; 6] = [
        Lottery::MegaSena,
        Lottery::Lotofacil,
        Lottery::Quina,
        Lottery::Lotomania,
        Lottery::Timemania,
        Lottery::DiaDeSorte,
    ];

    /// Chave usada pela API de resultados e pela base local.
    pub fn slug(&self) -> &'static str {
        match self {
            Lottery::MegaSena => "megasena",
            Lottery::Lotofacil => "lotofacil",
            Lottery::Quina => "quina",
            Lottery::Lotomania => "lotomania",
            Lottery::Timemania => "timemania",
            Lottery::DiaDeSorte => "diadesorte",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Lottery> {
        Lottery::ALL.into_iter().find(|l| l.slug() == slug)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Lottery::MegaSena => "Mega-Sena",
            Lottery::Lotofacil => "Lotofácil",
            Lottery::Quina => "Quina",
            Lottery::Lotomania => "Lotomania",
            Lottery::Timemania => "Timemania",
            Lottery::DiaDeSorte => "Dia de Sorte",
        }
    }

    pub fn min_number(&self) -> u8 {
        match self {
            Lottery::Lotomania => 0,
            _ => 1,
        }
    }

    pub fn max_number(&self) -> u8 {
        match self {
            Lottery::MegaSena => 60,
            Lottery::Lotofacil => 25,
            Lottery::Quina => 80,
            Lottery::Lotomania => 99,
            Lottery::Timemania => 80,
            Lottery::DiaDeSorte => 31,
        }
    }

    pub fn pool_size(&self) -> usize {
        (self.max_number() - self.min_number()) as usize + 1
    }

    /// Quantidade de dezenas sorteadas por concurso.
    pub fn draw_size(&self) -> usize {
        match self {
            Lottery::MegaSena => 6,
            Lottery::Lotofacil => 15,
            Lottery::Quina => 5,
            Lottery::Lotomania => 20,
            Lottery::Timemania => 7,
            Lottery::DiaDeSorte => 7,
        }
    }

    pub fn min_pick(&self) -> usize {
        match self {
            Lottery::MegaSena => 6,
            Lottery::Lotofacil => 15,
            Lottery::Quina => 5,
            Lottery::Lotomania => 50,
            Lottery::Timemania => 10,
            Lottery::DiaDeSorte => 7,
        }
    }

    pub fn max_pick(&self) -> usize {
        match self {
            Lottery::MegaSena => 20,
            Lottery::Lotofacil => 20,
            Lottery::Quina => 15,
            Lottery::Lotomania => 50,
            Lottery::Timemania => 10,
            Lottery::DiaDeSorte => 15,
        }
    }

    /// Menor número de acertos que ainda paga prêmio.
    pub fn min_prize_hits(&self) -> usize {
        match self {
            Lottery::MegaSena => 4,
            Lottery::Lotofacil => 11,
            Lottery::Quina => 2,
            Lottery::Lotomania => 15,
            Lottery::Timemania => 3,
            Lottery::DiaDeSorte => 4,
        }
    }

    pub fn numbers(&self) -> impl Iterator<Item = u8> {
        self.min_number()..=self.max_number()
    }

    /// Posição do número no vetor de frequências, ou None fora da faixa.
    pub fn index_of(&self, number: u8) -> Option<usize> {
        if number < self.min_number() || number > self.max_number() {
            return None;
        }
        Some((number - self.min_number()) as usize)
    }

    pub fn contains(&self, number: u8) -> bool {
        self.index_of(number).is_some()
    }
}

impl std::fmt::Display for Lottery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub lottery: Lottery,
    pub contest: u32,
    pub date: NaiveDate,
    pub numbers: Vec<u8>,
}

impl Draw {
    pub fn new(lottery: Lottery, contest: u32, date: NaiveDate, mut numbers: Vec<u8>) -> Result<Draw> {
        validate_draw(lottery, &numbers)?;
        numbers.sort();
        Ok(Draw { lottery, contest, date, numbers })
    }
}

#[derive(Debug, Clone)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    pub gap: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberTag {
    Hot,
    Cold,
    Normal,
}

impl std::fmt::Display for NumberTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberTag::Hot => write!(f, "HOT"),
            NumberTag::Cold => write!(f, "COLD"),
            NumberTag::Normal => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LotteryStatistics {
    pub lottery: Lottery,
    pub draws_analyzed: usize,
    pub numbers: Vec<NumberStats>,
    pub hot: Vec<u8>,
    pub cold: Vec<u8>,
    pub average_sum: f64,
    pub average_even: f64,
}

impl LotteryStatistics {
    pub fn tag_for(&self, number: u8) -> NumberTag {
        if self.hot.contains(&number) {
            NumberTag::Hot
        } else if self.cold.contains(&number) {
            NumberTag::Cold
        } else {
            NumberTag::Normal
        }
    }

    pub fn total_frequency(&self) -> u32 {
        self.numbers.iter().map(|s| s.frequency).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Hot,
    Cold,
    #[default]
    Balanced,
    Random,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Hot => "hot",
            Strategy::Cold => "cold",
            Strategy::Balanced => "balanced",
            Strategy::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Strategy> {
        match s {
            "hot" => Some(Strategy::Hot),
            "cold" => Some(Strategy::Cold),
            "balanced" => Some(Strategy::Balanced),
            "random" => Some(Strategy::Random),
            _ => None,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Hot => write!(f, "Quentes"),
            Strategy::Cold => write!(f, "Frias"),
            Strategy::Balanced => write!(f, "Equilibrada"),
            Strategy::Random => write!(f, "Aleatória"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub numbers: Vec<u8>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSource {
    Generator,
    Manual,
}

impl GameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameSource::Generator => "generator",
            GameSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<GameSource> {
        match s {
            "generator" => Some(GameSource::Generator),
            "manual" => Some(GameSource::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedGame {
    pub id: i64,
    pub lottery: Lottery,
    pub numbers: Vec<u8>,
    pub strategy: Option<Strategy>,
    pub source: GameSource,
    pub created_at: NaiveDateTime,
}

fn check_numbers(lottery: Lottery, numbers: &[u8]) -> Result<()> {
    for &n in numbers {
        if !lottery.contains(n) {
            bail!(
                "Dezena {} fora da faixa ({}-{}) da {}",
                n,
                lottery.min_number(),
                lottery.max_number(),
                lottery
            );
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Dezena repetida : {}", numbers[i]);
            }
        }
    }
    Ok(())
}

pub fn validate_draw(lottery: Lottery, numbers: &[u8]) -> Result<()> {
    if numbers.len() != lottery.draw_size() {
        bail!(
            "A {} sorteia {} dezenas, recebido {}",
            lottery,
            lottery.draw_size(),
            numbers.len()
        );
    }
    check_numbers(lottery, numbers)
}

pub fn validate_game(lottery: Lottery, numbers: &[u8]) -> Result<()> {
    if numbers.len() < lottery.min_pick() || numbers.len() > lottery.max_pick() {
        bail!(
            "Um jogo da {} tem de {} a {} dezenas, recebido {}",
            lottery,
            lottery.min_pick(),
            lottery.max_pick(),
            numbers.len()
        );
    }
    check_numbers(lottery, numbers)
}

pub fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draw_ok() {
        assert!(validate_draw(Lottery::MegaSena, &[1, 2, 3, 4, 5, 60]).is_ok());
        assert!(validate_draw(Lottery::Quina, &[80, 79, 78, 77, 76]).is_ok());
    }

    #[test]
    fn test_validate_draw_wrong_size() {
        assert!(validate_draw(Lottery::MegaSena, &[1, 2, 3, 4, 5]).is_err());
        assert!(validate_draw(Lottery::Quina, &[1, 2, 3, 4, 5, 6]).is_err());
    }

    #[test]
    fn test_validate_draw_out_of_range() {
        assert!(validate_draw(Lottery::MegaSena, &[0, 2, 3, 4, 5, 6]).is_err());
        assert!(validate_draw(Lottery::MegaSena, &[1, 2, 3, 4, 5, 61]).is_err());
    }

    #[test]
    fn test_validate_draw_duplicate() {
        assert!(validate_draw(Lottery::MegaSena, &[1, 1, 3, 4, 5, 6]).is_err());
    }

    #[test]
    fn test_lotomania_accepts_zero() {
        let numbers: Vec<u8> = (0..20).map(|i| i * 5).collect();
        assert!(validate_draw(Lottery::Lotomania, &numbers).is_ok());
    }

    #[test]
    fn test_validate_game_bounds() {
        assert!(validate_game(Lottery::MegaSena, &[1, 2, 3, 4, 5]).is_err());
        assert!(validate_game(Lottery::MegaSena, &[1, 2, 3, 4, 5, 6]).is_ok());
        let twenty: Vec<u8> = (1..=20).collect();
        assert!(validate_game(Lottery::MegaSena, &twenty).is_ok());
        let twenty_one: Vec<u8> = (1..=21).collect();
        assert!(validate_game(Lottery::MegaSena, &twenty_one).is_err());
    }

    #[test]
    fn test_pool_size() {
        assert_eq!(Lottery::MegaSena.pool_size(), 60);
        assert_eq!(Lottery::Lotofacil.pool_size(), 25);
        assert_eq!(Lottery::Lotomania.pool_size(), 100);
        assert_eq!(Lottery::DiaDeSorte.numbers().count(), 31);
    }

    #[test]
    fn test_index_of() {
        assert_eq!(Lottery::MegaSena.index_of(1), Some(0));
        assert_eq!(Lottery::MegaSena.index_of(60), Some(59));
        assert_eq!(Lottery::MegaSena.index_of(0), None);
        assert_eq!(Lottery::Lotomania.index_of(0), Some(0));
        assert_eq!(Lottery::Lotomania.index_of(99), Some(99));
    }

    #[test]
    fn test_slug_roundtrip() {
        for lottery in Lottery::ALL {
            assert_eq!(Lottery::from_slug(lottery.slug()), Some(lottery));
        }
        assert_eq!(Lottery::from_slug("euromillions"), None);
    }

    #[test]
    fn test_pick_bounds_cover_draw_size() {
        for lottery in Lottery::ALL {
            assert!(lottery.min_pick() <= lottery.max_pick());
            assert!(lottery.max_pick() <= lottery.pool_size());
            assert!(lottery.min_prize_hits() <= lottery.draw_size());
        }
    }

    #[test]
    fn test_draw_new_sorts() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let draw = Draw::new(Lottery::Quina, 10, date, vec![50, 3, 17, 80, 1]).unwrap();
        assert_eq!(draw.numbers, vec![1, 3, 17, 50, 80]);
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(format_numbers(&[0, 5, 42]), "00 - 05 - 42");
    }
}
