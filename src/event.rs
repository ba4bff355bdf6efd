use crate::common::{Alliance, ItemSlot, Lane, RaxKind};
use crate::scanner::RawRecord;

/// A telemetry record classified into a game event.
///
/// Player identities are raw colour values here. Which side of a record the
/// subject comes from (key suffix or value) varies per key and is kept
/// exactly as the map sends it, including the `Level`/`Assist` asymmetry.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsEvent {
    /// A hero died. `killer` may be 0 or 6 when the team itself dealt the
    /// killing blow.
    HeroKill { killer: u32, victim: u32 },
    /// The level comes from the key suffix, the subject colour from the
    /// value. The map really does send it this way around.
    HeroLevel { colour: u32, level: u32 },
    Assist { assister: u32, victim: u32 },
    CourierKill { killer: u32, owner: u32 },
    TowerKill { killer: u32, tower: Tower },
    RaxKill { killer: u32, rax: Rax },
    ThroneHp(u32),
    TreeHp(u32),
    /// "CK" disconnect marker.
    PlayerLeft,
    CreepKills { colour: u32, count: u32 },
    CreepDenies { colour: u32, count: u32 },
    NeutralKills { colour: u32, count: u32 },
    GameStart,
    Winner(u32),
    ElapsedMin(u32),
    ElapsedSec(u32),
    /// End-of-game per-player snapshot. `field` is `None` for keys the map
    /// sends but the accumulator deliberately ignores; the snapshot still
    /// stamps the colour and team on the slot.
    Snapshot {
        colour: u32,
        field: Option<Snapshot>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub alliance: Alliance,
    pub level: char,
    pub lane: Lane,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rax {
    pub alliance: Alliance,
    pub lane: Lane,
    pub kind: RaxKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    CreepKills(u32),
    CreepDenies(u32),
    Gold(u32),
    NeutralKills(u32),
    Item { slot: ItemSlot, code: String },
    Hero(String),
    /// The map numbers players 1-10 while colours run 1-5 and 7-11; values
    /// of 6 and above are shifted up by one to reconcile the two.
    Id(u32),
}

type DataParser = fn(&str, &RawRecord) -> Option<StatsEvent>;

/// Key dispatch for the "Data" namespace. First match wins, so the order
/// mirrors the original comparison chain. The second column is the minimum
/// key length the key must have before the prefix is considered at all.
const DATA_KEYS: &[(&str, usize, DataParser)] = &[
    ("Hero", 5, data_hero),
    ("Level", 6, data_level),
    ("Assist", 7, data_assist),
    ("Courier", 8, data_courier),
    ("Tower", 8, data_tower),
    ("Rax", 6, data_rax),
    ("Throne", 6, data_throne),
    ("Tree", 4, data_tree),
    ("CK", 2, data_ck),
    ("CSK", 3, data_csk),
    ("CSD", 3, data_csd),
    ("NK", 2, data_nk),
    ("GameStart", 9, data_game_start),
];

impl StatsEvent {
    /// Classify a raw telemetry triple. Unknown namespaces and keys yield
    /// `None` so future map telemetry passes through harmlessly.
    pub fn classify(record: &RawRecord) -> Option<StatsEvent> {
        let namespace = record.namespace_str().ok()?;
        match namespace {
            "Data" => classify_data(record.key_str().ok()?, record),
            "Global" => classify_global(record.key_str().ok()?, record),
            _ => {
                if namespace.is_empty()
                    || namespace.len() > 2
                    || !namespace.bytes().all(|b| b.is_ascii_digit())
                {
                    return None;
                }
                classify_snapshot(namespace.parse().ok()?, record.key_str().ok()?, record)
            }
        }
    }
}

fn classify_data(key: &str, record: &RawRecord) -> Option<StatsEvent> {
    for (prefix, min_len, parse) in DATA_KEYS {
        if key.len() >= *min_len && key.starts_with(prefix) {
            return parse(&key[prefix.len()..], record);
        }
    }
    None
}

/// Numeric key suffixes are parsed the way the original converted strings:
/// anything that is not a number becomes 0.
fn suffix_colour(suffix: &str) -> u32 {
    suffix.parse().unwrap_or(0)
}

fn data_hero(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::HeroKill {
        killer: record.value_u32(),
        victim: suffix_colour(suffix),
    })
}

fn data_level(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::HeroLevel {
        colour: record.value_u32(),
        level: suffix_colour(suffix),
    })
}

fn data_assist(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::Assist {
        assister: suffix_colour(suffix),
        victim: record.value_u32(),
    })
}

fn data_courier(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::CourierKill {
        killer: record.value_u32(),
        owner: suffix_colour(suffix),
    })
}

fn data_tower(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    let digits = suffix.as_bytes();
    Some(StatsEvent::TowerKill {
        killer: record.value_u32(),
        tower: Tower {
            alliance: Alliance::from_digit(digits[0]),
            level: digits[1] as char,
            lane: Lane::from_digit(digits[2]),
        },
    })
}

fn data_rax(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    let digits = suffix.as_bytes();
    Some(StatsEvent::RaxKill {
        killer: record.value_u32(),
        rax: Rax {
            alliance: Alliance::from_digit(digits[0]),
            lane: Lane::from_digit(digits[1]),
            kind: RaxKind::from_digit(digits[2]),
        },
    })
}

fn data_throne(_suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::ThroneHp(record.value_u32()))
}

fn data_tree(_suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::TreeHp(record.value_u32()))
}

fn data_ck(_suffix: &str, _record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::PlayerLeft)
}

fn data_csk(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::CreepKills {
        colour: suffix_colour(suffix),
        count: record.value_u32(),
    })
}

fn data_csd(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::CreepDenies {
        colour: suffix_colour(suffix),
        count: record.value_u32(),
    })
}

fn data_nk(suffix: &str, record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::NeutralKills {
        colour: suffix_colour(suffix),
        count: record.value_u32(),
    })
}

fn data_game_start(_suffix: &str, _record: &RawRecord) -> Option<StatsEvent> {
    Some(StatsEvent::GameStart)
}

fn classify_global(key: &str, record: &RawRecord) -> Option<StatsEvent> {
    match key {
        "Winner" => Some(StatsEvent::Winner(record.value_u32())),
        "m" => Some(StatsEvent::ElapsedMin(record.value_u32())),
        "s" => Some(StatsEvent::ElapsedSec(record.value_u32())),
        _ => None,
    }
}

fn classify_snapshot(colour: u32, key: &str, record: &RawRecord) -> Option<StatsEvent> {
    let field = match key {
        // kills, deaths and assists are already tracked live through the
        // "Data" events; the end-of-game totals are received but not applied
        "1" | "2" | "5" => None,
        "3" => Some(Snapshot::CreepKills(record.value_u32())),
        "4" => Some(Snapshot::CreepDenies(record.value_u32())),
        "6" => Some(Snapshot::Gold(record.value_u32())),
        "7" => Some(Snapshot::NeutralKills(record.value_u32())),
        "8_0" | "8_1" | "8_2" | "8_3" | "8_4" | "8_5" => {
            let index = (key.as_bytes()[2] - b'0') as usize;
            Some(Snapshot::Item {
                slot: ItemSlot::from_index(index)?,
                code: record.value_string(),
            })
        }
        "9" => Some(Snapshot::Hero(record.value_string())),
        "id" => {
            let id = record.value_u32();
            Some(Snapshot::Id(if id >= 6 { id + 1 } else { id }))
        }
        _ => None,
    };
    Some(StatsEvent::Snapshot { colour, field })
}
