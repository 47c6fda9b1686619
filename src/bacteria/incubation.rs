//! Incubation delays per bacterium and the deadline arithmetic built on them.
//!
//! Readiness is always computed lazily from the seeding timestamp; nothing here is
//! scheduled or persisted on its own.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Delay applied to bacterium names missing from the catalog
pub const DEFAULT_DELAY_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Bacterium {
    Enterobacteria,
    EscherichiaColi,
    TotalColiforms,
    Staphylococci,
    Listeria,
    YeastMoldShort,
    TotalFlora,
    Leuconostoc,
    YeastMoldLong,
}

impl Bacterium {
    pub const ALL: [Bacterium; 9] = [
        Bacterium::Enterobacteria,
        Bacterium::EscherichiaColi,
        Bacterium::TotalColiforms,
        Bacterium::Staphylococci,
        Bacterium::Listeria,
        Bacterium::YeastMoldShort,
        Bacterium::TotalFlora,
        Bacterium::Leuconostoc,
        Bacterium::YeastMoldLong,
    ];

    /// Name as printed on lab forms and stored on selections
    pub fn display_name(self) -> &'static str {
        match self {
            Bacterium::Enterobacteria => "Entérobactéries",
            Bacterium::EscherichiaColi => "Escherichia coli",
            Bacterium::TotalColiforms => "Coliformes totaux",
            Bacterium::Staphylococci => "Staphylocoques",
            Bacterium::Listeria => "Listeria",
            Bacterium::YeastMoldShort => "Levures/Moisissures (3j)",
            Bacterium::TotalFlora => "Flore totales",
            Bacterium::Leuconostoc => "Leuconostoc",
            Bacterium::YeastMoldLong => "Levures/Moisissures (5j)",
        }
    }

    pub fn delay_hours(self) -> i64 {
        match self {
            Bacterium::Enterobacteria | Bacterium::EscherichiaColi => 24,
            Bacterium::TotalColiforms | Bacterium::Staphylococci | Bacterium::Listeria => 48,
            Bacterium::YeastMoldShort | Bacterium::TotalFlora => 72,
            Bacterium::Leuconostoc => 96,
            Bacterium::YeastMoldLong => 120,
        }
    }

    pub fn delay(self) -> Duration {
        Duration::hours(self.delay_hours())
    }

    /// Delay label in the lab's notation (`h` for hours, `j` for days)
    pub fn delay_label(self) -> &'static str {
        match self {
            Bacterium::Enterobacteria | Bacterium::EscherichiaColi => "24h",
            Bacterium::TotalColiforms | Bacterium::Staphylococci | Bacterium::Listeria => "48h",
            Bacterium::YeastMoldShort => "3j",
            Bacterium::TotalFlora => "72h",
            Bacterium::Leuconostoc => "4j",
            Bacterium::YeastMoldLong => "5j",
        }
    }

    /// Resolve a free-text name, ignoring case, accents and spacing.
    /// A bare "Levures/Moisissures" resolves to the five-day variant.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize_name(name);
        if wanted == "levures/moisissures" {
            return Some(Bacterium::YeastMoldLong);
        }
        Self::ALL
            .into_iter()
            .find(|bacterium| normalize_name(bacterium.display_name()) == wanted)
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'ô' => 'o',
            'î' | 'ï' => 'i',
            'ù' | 'û' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Incubation delay for a stored bacterium name, falling back to 24h
pub fn delay_for(name: &str) -> Duration {
    Bacterium::from_name(name).map_or(Duration::hours(DEFAULT_DELAY_HOURS), Bacterium::delay)
}

pub fn compute_due_date(seeded_at: DateTime<Utc>, bacterium_name: &str) -> DateTime<Utc> {
    seeded_at + delay_for(bacterium_name)
}

pub fn is_ready(now: DateTime<Utc>, seeded_at: DateTime<Utc>, bacterium_name: &str) -> bool {
    now >= compute_due_date(seeded_at, bacterium_name)
}

/// Coarse weekday used to plan a reading. The lab does not read on Sundays, so a
/// Sunday due date is planned for the Monday after.
pub fn reading_day(due_at: DateTime<Utc>) -> Weekday {
    match due_at.weekday() {
        Weekday::Sun => Weekday::Mon,
        day => day,
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Catalog entry served to clients building the selection screen
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BacteriumInfo {
    pub bacterium: Bacterium,
    pub name: String,
    pub delay: String,
    pub delay_hours: i64,
}

impl From<Bacterium> for BacteriumInfo {
    fn from(bacterium: Bacterium) -> Self {
        Self {
            bacterium,
            name: bacterium.display_name().to_string(),
            delay: bacterium.delay_label().to_string(),
            delay_hours: bacterium.delay_hours(),
        }
    }
}
