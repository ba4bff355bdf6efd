use crate::accumulator::PlayerStats;
use crate::common::{valid_colour, Outcome};
use ahash::AHashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// One row per finished game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRow {
    pub game_id: u32,
    pub winner: u32,
    pub min: u32,
    pub sec: u32,
}

/// One row per player that produced any telemetry during the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub game_id: u32,
    pub name: String,
    pub colour: u32,
    pub kills: u32,
    pub deaths: u32,
    pub creep_kills: u32,
    pub creep_denies: u32,
    pub assists: u32,
    pub gold: u32,
    pub neutral_kills: u32,
    pub items: [String; 6],
    pub hero: String,
    pub new_colour: u32,
    pub tower_kills: u32,
    pub rax_kills: u32,
    pub courier_kills: u32,
    pub outcome: u32,
    pub level: u32,
    /// Not computed by this layer.
    pub apm: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum EventKind {
    HeroKill,
    TowerKill,
}

impl EventKind {
    pub fn code(self) -> u32 {
        match self {
            EventKind::HeroKill => 0,
            EventKind::TowerKill => 1,
        }
    }
}

/// Live feed row, emitted as kills and tower deaths are observed rather than
/// at the end of the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub kind: EventKind,
    pub game_name: String,
    pub killer: String,
    /// Victim player name, or a "level,alliance,lane" description for
    /// tower events.
    pub victim: String,
    pub killer_colour: u32,
    pub victim_colour: u32,
}

/// Handle returned by a sink submission. Completion is observed by polling;
/// the stats layer itself never waits on one.
pub trait SinkTicket {
    fn is_ready(&self) -> bool;
    /// Meaningful once `is_ready` returns true.
    fn succeeded(&self) -> bool;
}

/// Asynchronous write sink for finished rows. Submissions are fire and
/// forget: implementations must queue the work and return immediately.
pub trait StatsSink {
    type Ticket: SinkTicket;

    fn game_row(&mut self, row: GameRow) -> Self::Ticket;
    fn player_row(&mut self, row: PlayerRow) -> Self::Ticket;
    fn event_row(&mut self, row: EventRow) -> Self::Ticket;
}

/// In-memory sink for tests and offline replays; every submission completes
/// instantly.
#[derive(Debug, Default, Serialize)]
pub struct MemorySink {
    pub games: Vec<GameRow>,
    pub players: Vec<PlayerRow>,
    pub events: Vec<EventRow>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryTicket;

impl SinkTicket for MemoryTicket {
    fn is_ready(&self) -> bool {
        true
    }

    fn succeeded(&self) -> bool {
        true
    }
}

impl StatsSink for MemorySink {
    type Ticket = MemoryTicket;

    fn game_row(&mut self, row: GameRow) -> MemoryTicket {
        self.games.push(row);
        MemoryTicket
    }

    fn player_row(&mut self, row: PlayerRow) -> MemoryTicket {
        self.players.push(row);
        MemoryTicket
    }

    fn event_row(&mut self, row: EventRow) -> MemoryTicket {
        self.events.push(row);
        MemoryTicket
    }
}

/// What a successful save submitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SaveSummary {
    pub players: usize,
    pub winner: u32,
    pub min: u32,
    pub sec: u32,
}

#[derive(Error, Debug, PartialEq)]
pub enum SaveError {
    /// Two records claim the same colour, which only happens when the map
    /// sent garbage. The whole game is rejected rather than guessing which
    /// record to keep.
    #[error("duplicate player colour {0}, game stats discarded")]
    DuplicateColour(u32),
}

/// Validate the accumulated records and turn them into persistence rows.
/// No rows are produced at all when validation rejects the game.
pub fn prepare_rows(
    game_id: u32,
    records: Vec<PlayerStats>,
    winner: u32,
    duration: (u32, u32),
    lobby_players: &[(u32, String)],
) -> Result<(GameRow, Vec<PlayerRow>), SaveError> {
    let mut survivors: Vec<PlayerStats> = Vec::with_capacity(records.len());

    for record in records {
        if !valid_colour(record.colour) {
            warn!(
                colour = record.colour,
                "discarding player record, invalid colour"
            );
            continue;
        }
        if let Some(previous) = survivors.iter().find(|p| p.colour == record.colour) {
            return Err(SaveError::DuplicateColour(previous.colour));
        }
        survivors.push(record);
    }

    // first lobby entry per colour wins
    let mut names: AHashMap<u32, &str> = AHashMap::with_capacity(lobby_players.len());
    for (colour, name) in lobby_players {
        names.entry(*colour).or_insert(name.as_str());
    }

    let (min, sec) = duration;
    let game = GameRow {
        game_id,
        winner,
        min,
        sec,
    };

    let players = survivors
        .into_iter()
        .map(|mut record| {
            if let Some(name) = names.get(&record.colour) {
                record.name = (*name).to_string();
            }
            let outcome = Outcome::resolve(record.colour, winner);
            PlayerRow {
                game_id,
                name: record.name,
                colour: record.colour,
                kills: record.kills,
                deaths: record.deaths,
                creep_kills: record.creep_kills,
                creep_denies: record.creep_denies,
                assists: record.assists,
                gold: record.gold,
                neutral_kills: record.neutral_kills,
                items: record.items,
                hero: record.hero,
                new_colour: record.new_colour,
                tower_kills: record.tower_kills,
                rax_kills: record.rax_kills,
                courier_kills: record.courier_kills,
                outcome: outcome.into(),
                level: record.level,
                apm: 0,
            }
        })
        .collect();

    Ok((game, players))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(colour: u32) -> PlayerStats {
        PlayerStats::new(colour)
    }

    #[test]
    fn invalid_colour_is_dropped_not_fatal() {
        let mut bad = stats(3);
        bad.colour = 6;
        let (game, players) =
            prepare_rows(7, vec![bad, stats(2)], 1, (10, 30), &[]).unwrap();
        assert_eq!(game.winner, 1);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].colour, 2);
        assert_eq!(players[0].outcome, 1);
    }

    #[test]
    fn duplicate_colour_rejects_the_game() {
        let mut imposter = stats(9);
        imposter.colour = 4;
        let result = prepare_rows(7, vec![stats(4), imposter], 1, (0, 0), &[]);
        assert_eq!(result.unwrap_err(), SaveError::DuplicateColour(4));
    }

    #[test]
    fn first_lobby_name_wins() {
        let lobby = vec![
            (5, "early".to_string()),
            (5, "late".to_string()),
            (8, "other".to_string()),
        ];
        let (_, players) = prepare_rows(1, vec![stats(5)], 0, (0, 0), &lobby).unwrap();
        assert_eq!(players[0].name, "early");
        assert_eq!(players[0].outcome, 0);
    }

    #[test]
    fn apm_is_fixed_at_zero() {
        let (_, players) = prepare_rows(1, vec![stats(1)], 2, (1, 2), &[]).unwrap();
        assert_eq!(players[0].apm, 0);
        assert_eq!(players[0].outcome, 2);
        assert_eq!(players[0].level, 1);
    }

    #[test]
    fn event_kind_codes() {
        assert_eq!(EventKind::HeroKill.code(), 0);
        assert_eq!(EventKind::TowerKill.code(), 1);
    }
}
