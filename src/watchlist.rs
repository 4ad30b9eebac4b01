use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::team_match::MatchStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistTier {
    /// Defensive sides worth a look when they meet an equal.
    Elite,
    /// Lower-division sides with a strong Under 2.5 record.
    LowTierStar,
}

impl WatchlistTier {
    pub fn badge(self) -> &'static str {
        match self {
            WatchlistTier::Elite => "👁️ W",
            WatchlistTier::LowTierStar => "🔍 W",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub elite: Vec<String>,
    pub low_tier: Vec<String>,
}

const ELITE: &[&str] = &[
    "Динамо Махачкала",
    "Балтика",
    "Рубин",
    "Зенит",
    "Porto",
    "FC Porto",
    "FCSB",
    "FCSB Bucuresti",
    "CFR Cluj",
    "Paks",
    "Ferencvaros",
    "Ferencvárosi TC",
    "Atletico Madrid",
    "Atlético Madrid",
    "Real Sociedad",
    "Inter",
    "Inter Milan",
    "Napoli",
    "Juventus",
    "Roma",
    "Milan",
    "AC Milan",
    "Lille",
    "Lens",
    "Monaco",
    "AS Monaco",
    "Everton",
    "Eintracht Frankfurt",
    "Stuttgart",
    "VfB Stuttgart",
    "Bayer Leverkusen",
    "Anderlecht",
    "Genk",
    "KRC Genk",
    "PSV",
    "PSV Eindhoven",
    "Ajax",
    "AFC Ajax",
];

const LOW_TIER: &[&str] = &[
    "RC Bobo-Dioulasso",
    "Aueta",
    "Dynamo Abomey",
    "Singida Black Stars",
    "Dong Thap",
    "Samartex",
    "Fard Alborz",
    "Fasil Ketema",
    "Siwelele",
    "Mufulira Wanderers",
    "Green Eagles",
    "NAPSA Stars",
    "Nchanga Rangers",
    "Kansanshi Dynamos",
    "Atletico ECCA",
    "Pharco",
    "Fundadores",
    "Pikine",
    "Jaraaf",
    "Teungueth",
    "AJEL",
    "Derby Academie",
    "Union Sportive Boujaad",
    "Academica do Lobito",
    "Kabuscorp",
    "Namungo",
    "Gubbio",
    "Aversa Normanna",
    "La Solana",
    "UD Melilla II",
    "Tanzania Prisons",
    "Shahrdari Noshahr",
    "Ario Eslamshahr",
    "Kedus Giorgis",
    "Stade Malien Bamako",
    "Raja Casablanca",
    "Shams Azar Qazvin",
    "Sekhukhune United",
    "Zacatepec",
    "Sporting Cascades",
    "Karystos",
    "Nkana",
    "Konkola Blades",
    "Kabwe Warriors",
    "Zanaco",
    "Sesvete",
    "AS Cotonou",
    "Mathare United",
    "Al Qadisiyah Bani Walid",
    "Dikhil",
    "Azam",
    "Entebbe UPPC",
    "Al Quwa Al Jawiya",
    "General Paz Juniors",
    "Salgueiros",
    "Kaizer Chiefs",
    "Vilaverdense",
    "Katsina United",
    "Abia Warriors",
    "St Maur Lusitanos",
    "Tanta SC",
    "Dayrout",
    "Bandari",
    "XV de Piracicaba",
    "Votuporanguense",
    "Inter de Limeira",
    "Al Watan",
    "Estudiantes de San Luis",
    "Merreikh Kosti",
    "Hilal El-Fasher",
    "Al Fallah",
    "Porto Vitoria",
    "Eastern District",
    "Police XI",
    "UD Ourense",
    "Porreres",
    "FC Siena",
    "Pompei",
    "Virtus Ciserano Bergamo",
    "Smouha SC",
    "El Gounah",
    "Cuarte",
    "Villacanas",
    "Durango",
    "Hearts of Oak",
    "Arenas Armilla",
    "Mes Kerman",
    "Lamboi",
    "Gor Mahia",
    "Yuksekova Belediyespor W",
    "US Ouakam",
    "Stade de Mbour",
    "Wally Daan",
    "Mashujaa",
    "1° de Maio",
    "CD Lunda-Sul",
    "Chabab Atlas Khenifra",
    "Thap Luang United",
    "Safa",
    "Kai out Couth",
];

static DEFAULT_WATCHLIST: Lazy<Watchlist> = Lazy::new(|| Watchlist {
    elite: ELITE.iter().map(|s| s.to_string()).collect(),
    low_tier: LOW_TIER.iter().map(|s| s.to_string()).collect(),
});

impl Default for Watchlist {
    fn default() -> Self {
        DEFAULT_WATCHLIST.clone()
    }
}

impl Watchlist {
    pub fn builtin() -> &'static Watchlist {
        &DEFAULT_WATCHLIST
    }

    /// Reads `{"elite": [...], "low_tier": [...]}`, replacing the built-in lists.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read watchlist {}", path.display()))?;
        serde_json::from_str(&raw).context("invalid watchlist json")
    }

    /// Tier of a single team; elite entries are checked before low-tier ones.
    pub fn tier_of(&self, team: &str, strategy: MatchStrategy) -> Option<WatchlistTier> {
        if self.elite.iter().any(|t| strategy.matches(team, t)) {
            return Some(WatchlistTier::Elite);
        }
        if self.low_tier.iter().any(|t| strategy.matches(team, t)) {
            return Some(WatchlistTier::LowTierStar);
        }
        None
    }

    /// Badge for a fixture: the home side's tier wins over the away side's.
    pub fn badge_for(&self, home: &str, away: &str, strategy: MatchStrategy) -> Option<&'static str> {
        self.tier_of(home, strategy)
            .or_else(|| self.tier_of(away, strategy))
            .map(WatchlistTier::badge)
    }
}
