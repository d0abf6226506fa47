//! Category, severity and side derivation.
//!
//! Every consumer (marker colour, chart bucket, card border, legend) reads
//! these through the functions here so labels never diverge between views.

use serde::{Deserialize, Serialize};

use crate::text::{contains_at_word_start, count_at_word_start};

// =============================================================================
// Category
// =============================================================================

/// Kinetic event taxonomy. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Naval")]
    Naval,
    #[serde(rename = "Drone Strike")]
    DroneStrike,
    #[serde(rename = "Missile Strike")]
    MissileStrike,
    #[serde(rename = "Airstrike")]
    Airstrike,
    #[serde(rename = "Artillery Shelling")]
    ArtilleryShelling,
    #[serde(rename = "IED/Explosion")]
    IedExplosion,
    #[serde(rename = "Ground Clash")]
    GroundClash,
    #[serde(rename = "Political/Unrest")]
    PoliticalUnrest,
    #[serde(rename = "Civil/Accident")]
    CivilAccident,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Naval,
        Category::DroneStrike,
        Category::MissileStrike,
        Category::Airstrike,
        Category::ArtilleryShelling,
        Category::IedExplosion,
        Category::GroundClash,
        Category::PoliticalUnrest,
        Category::CivilAccident,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Naval => "Naval",
            Category::DroneStrike => "Drone Strike",
            Category::MissileStrike => "Missile Strike",
            Category::Airstrike => "Airstrike",
            Category::ArtilleryShelling => "Artillery Shelling",
            Category::IedExplosion => "IED/Explosion",
            Category::GroundClash => "Ground Clash",
            Category::PoliticalUnrest => "Political/Unrest",
            Category::CivilAccident => "Civil/Accident",
        }
    }

    /// Case-insensitive lookup by display label.
    pub fn from_label(label: &str) -> Option<Category> {
        let wanted = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }
}

/// One row of the classification table: any keyword hit yields `category`.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
}

impl CategoryRule {
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|kw| keyword_hit(text, kw))
    }
}

/// Short keywords that misfire inside longer words (`sea` in `research`,
/// `mine` in `determine`). These only match at the start of a word; every
/// other keyword matches anywhere, so `counterattack` and `antiship` hit.
pub const WORD_START_KEYWORDS: &[&str] = &[
    "sea", "air", "jet", "uav", "fpv", "su-", "mig-", "tu-", "kab", "grad", "ied", "mine", "trap",
    "raid", "riot", "ground",
];

fn keyword_hit(text: &str, keyword: &str) -> bool {
    if WORD_START_KEYWORDS.contains(&keyword) {
        contains_at_word_start(text, keyword)
    } else {
        text.contains(keyword)
    }
}

/// Priority order is the row order. Civil/Accident stays last so `fire`
/// cannot preempt `firefight`.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Naval,
        keywords: &["naval", "sea", "ship", "boat", "maritime", "vessel", "fleet"],
    },
    CategoryRule {
        category: Category::DroneStrike,
        keywords: &[
            "drone", "uav", "loitering", "kamikaze", "quadcopter", "unmanned", "shahed", "lancet",
            "fpv",
        ],
    },
    CategoryRule {
        category: Category::MissileStrike,
        keywords: &[
            "missile", "rocket", "ballistic", "cruise", "himars", "mlrs", "iskander", "kalibr",
            "storm shadow", "atacms",
        ],
    },
    CategoryRule {
        category: Category::Airstrike,
        keywords: &[
            "air", "jet", "plane", "bombing", "airstrike", "aircraft", "su-", "mig-", "tu-", "kab",
            "glide bomb",
        ],
    },
    CategoryRule {
        category: Category::ArtilleryShelling,
        keywords: &["artillery", "shelling", "mortar", "howitzer", "grad", "cannon", "shell"],
    },
    CategoryRule {
        category: Category::IedExplosion,
        keywords: &["ied", "mine", "landmine", "vbied", "explosion", "explosive", "trap", "blast"],
    },
    CategoryRule {
        category: Category::GroundClash,
        keywords: &[
            "clash", "firefight", "gunfire", "skirmish", "ambush", "raid", "attack", "ground", "shooting",
            "sniper", "assault", "infantry",
        ],
    },
    CategoryRule {
        category: Category::PoliticalUnrest,
        keywords: &[
            "politic", "protest", "riot", "demonstration", "diplomacy", "diplomatic", "unrest",
            "arrest",
        ],
    },
    CategoryRule {
        category: Category::CivilAccident,
        keywords: &[
            "civil", "accident", "crash", "fire", "infrastructure", "logistics", "humanitarian",
        ],
    },
];

/// Generic first-match-wins evaluation over an ordered rule table.
pub fn first_match<R, T>(rules: &[R], mut hit: impl FnMut(&R) -> Option<T>) -> Option<T> {
    rules.iter().find_map(|rule| hit(rule))
}

/// Classify a free-text `type` string. `None` when no rule matches.
pub fn classify_category(raw_type: &str) -> Option<Category> {
    let text = raw_type.to_lowercase();
    first_match(CATEGORY_RULES, |rule| rule.matches(&text).then_some(rule.category))
}

// =============================================================================
// Severity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Severity> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

pub const CRITICAL_MIN: f64 = 0.8;
pub const HIGH_MIN: f64 = 0.6;
pub const MEDIUM_MIN: f64 = 0.4;

/// Intensity bucket. Lower bounds are inclusive; NaN falls through to low.
pub fn severity_for(intensity: f64) -> Severity {
    if intensity >= CRITICAL_MIN {
        Severity::Critical
    } else if intensity >= HIGH_MIN {
        Severity::High
    } else if intensity >= MEDIUM_MIN {
        Severity::Medium
    } else {
        Severity::Low
    }
}

// =============================================================================
// Side
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "RU")]
    Ru,
    #[serde(rename = "UA")]
    Ua,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Ru => "RU",
            Side::Ua => "UA",
            Side::Unknown => "UNKNOWN",
        }
    }

    /// Actor codes an author may put on a record for this side.
    pub fn actor_codes(&self) -> &'static [&'static str] {
        match self {
            Side::Ru => &["RU", "RUS", "RF"],
            Side::Ua => &["UA", "UKR", "AFU"],
            Side::Unknown => &[],
        }
    }
}

pub const RU_LEXICON: &[&str] = &[
    "russia", "russian forces", "moscow", "kremlin", "putin", "wagner", "rf forces", "vks",
    "kadyrov",
];

pub const UA_LEXICON: &[&str] = &["ukrain", "kyiv forces", "zsu", "afu", "zelensk", "azov"];

fn lexicon_hits(text: &str, lexicon: &[&str]) -> usize {
    lexicon.iter().map(|term| count_at_word_start(text, term)).sum()
}

/// Best-effort combatant tag from title and description keyword counts.
///
/// The side with strictly more hits wins; any tie, including no hits at all,
/// is `Unknown`. Only used for tagging and colouring, never for exclusion.
pub fn derive_side(title: &str, description: &str) -> Side {
    let text = format!("{} {}", title, description).to_lowercase();
    let ru = lexicon_hits(&text, RU_LEXICON);
    let ua = lexicon_hits(&text, UA_LEXICON);
    match ru.cmp(&ua) {
        std::cmp::Ordering::Greater => Side::Ru,
        std::cmp::Ordering::Less => Side::Ua,
        std::cmp::Ordering::Equal => Side::Unknown,
    }
}

// =============================================================================
// Strategic persistence
// =============================================================================

/// Classifications that stay visible past the recency window.
pub const PERSISTENT_CLASSIFICATIONS: &[&str] = &["MANOEUVRE", "SHAPING_OFFENSIVE"];

/// TIE total at or above which an event is strategically persistent.
pub const PERSISTENT_TIE_MIN: f64 = 100.0;

pub fn is_strategically_persistent(tie_total: f64, classification: &str) -> bool {
    tie_total >= PERSISTENT_TIE_MIN || PERSISTENT_CLASSIFICATIONS.contains(&classification)
}
