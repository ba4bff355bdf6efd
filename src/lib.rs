//! Extracts DotA match statistics from the Warcraft III action stream of a
//! hosted game. Telemetry is embedded in ordinary game actions with no
//! framing of its own, so records are located heuristically, classified and
//! folded into per-player aggregates that are handed to a persistence sink
//! when the game ends.

pub use crate::accumulator::{PlayerStats, PlayerTable};
pub use crate::common::{valid_colour, Alliance, ItemSlot, Lane, Outcome, RaxKind, Team};
pub use crate::error::{Error, Result};
pub use crate::event::{Rax, Snapshot, StatsEvent, Tower};
pub use crate::outcome::{GameClock, OutcomeResolver, SystemClock};
pub use crate::save::{
    EventKind, EventRow, GameRow, MemorySink, MemoryTicket, PlayerRow, SaveError, SaveSummary,
    SinkTicket, StatsSink,
};
pub use crate::scanner::{RawRecord, TelemetryScanner, TELEMETRY_MARKER};

use tracing::{debug, info, trace, warn};

mod accumulator;
mod common;
mod error;
mod event;
mod outcome;
mod save;
mod scanner;

/// Lookup into the live player sessions of the hosting layer.
pub trait PlayerSource {
    /// Name of the connected player occupying `colour`, or `None` when the
    /// slot is empty or the player already disconnected.
    fn player_name(&self, colour: u32) -> Option<&str>;

    /// Push a team assignment back onto the live session. Implementations
    /// ignore colours without a session.
    fn assign_team(&mut self, colour: u32, team: Team);
}

/// Statistics session for one hosted game.
///
/// Feed every processed action through [`process_action`]; it reports the
/// moment the map announces a winner. Once the game ends, [`save`] validates
/// the accumulated records and submits them to the sink. Each concurrent
/// game owns its own session.
///
/// [`process_action`]: DotaStats::process_action
/// [`save`]: DotaStats::save
pub struct DotaStats<S: StatsSink, C: GameClock = SystemClock> {
    game_name: String,
    players: PlayerTable,
    resolver: OutcomeResolver,
    clock: C,
    tickets: Vec<S::Ticket>,
}

impl<S: StatsSink> DotaStats<S> {
    pub fn new(game_name: impl Into<String>) -> Self {
        Self::with_clock(game_name, SystemClock)
    }
}

impl<S: StatsSink, C: GameClock> DotaStats<S, C> {
    pub fn with_clock(game_name: impl Into<String>, clock: C) -> Self {
        DotaStats {
            game_name: game_name.into(),
            players: PlayerTable::new(),
            resolver: OutcomeResolver::new(),
            clock,
            tickets: Vec::new(),
        }
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    /// Live read access for the command layer, e.g. to answer in-game
    /// score queries.
    pub fn player(&self, colour: u32) -> Option<&PlayerStats> {
        self.players.get(colour)
    }

    pub fn players(&self) -> &PlayerTable {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut PlayerTable {
        &mut self.players
    }

    pub fn winner(&self) -> u32 {
        self.resolver.winner()
    }

    pub fn game_over(&self) -> bool {
        self.resolver.resolved()
    }

    /// Handles for all sink submissions so far, for completion polling.
    pub fn pending_tickets(&self) -> &[S::Ticket] {
        &self.tickets
    }

    pub fn take_tickets(&mut self) -> Vec<S::Ticket> {
        std::mem::take(&mut self.tickets)
    }

    /// Scan one action blob and apply every telemetry record found in it.
    /// Returns true when this action resolved the winner, i.e. the game is
    /// over as of this call.
    pub fn process_action<G: PlayerSource>(
        &mut self,
        action: &[u8],
        game: &mut G,
        sink: &mut S,
    ) -> bool {
        let mut game_over = false;
        for record in TelemetryScanner::new(action) {
            trace!(
                namespace = %String::from_utf8_lossy(record.namespace),
                key = %String::from_utf8_lossy(record.key),
                value = record.value_u32(),
                "telemetry record"
            );
            if let Some(event) = StatsEvent::classify(&record) {
                game_over |= self.apply(event, game, sink);
            }
        }
        game_over
    }

    fn apply<G: PlayerSource>(&mut self, event: StatsEvent, game: &mut G, sink: &mut S) -> bool {
        match event {
            StatsEvent::HeroKill { killer, victim } => {
                let killer_name = game.player_name(killer).map(str::to_owned);
                let victim_name = game.player_name(victim).map(str::to_owned);
                match (killer_name, victim_name) {
                    (Some(killer_name), Some(victim_name)) => {
                        if let Some(stats) = self.players.get_or_create(killer) {
                            // self kills report the same name on both sides
                            // and are not credited
                            if killer_name != victim_name {
                                stats.kills += 1;
                            }
                        }
                        if let Some(stats) = self.players.get_or_create(victim) {
                            stats.deaths += 1;
                        }
                        info!(
                            game = %self.game_name,
                            killer = %killer_name,
                            victim = %victim_name,
                            "hero killed"
                        );
                        let ticket = sink.event_row(EventRow {
                            kind: EventKind::HeroKill,
                            game_name: self.game_name.clone(),
                            killer: killer_name,
                            victim: victim_name,
                            killer_colour: killer,
                            victim_colour: victim,
                        });
                        self.tickets.push(ticket);
                    }
                    (Some(_), None) => {
                        // somebody killed a leaver, nothing left to record
                    }
                    (None, Some(victim_name)) => {
                        if let Some(stats) = self.players.get_or_create(victim) {
                            stats.deaths += 1;
                        }
                        match killer {
                            0 => info!(
                                game = %self.game_name,
                                victim = %victim_name,
                                "the Sentinel killed a hero"
                            ),
                            6 => info!(
                                game = %self.game_name,
                                victim = %victim_name,
                                "the Scourge killed a hero"
                            ),
                            _ => {}
                        }
                    }
                    (None, None) => {}
                }
            }
            StatsEvent::HeroLevel { colour, level } => {
                if game.player_name(colour).is_some() {
                    if let Some(stats) = self.players.get_or_create(colour) {
                        stats.level = level;
                    }
                }
            }
            StatsEvent::Assist { assister, victim } => {
                if game.player_name(assister).is_some() && game.player_name(victim).is_some() {
                    if let Some(stats) = self.players.get_or_create(assister) {
                        stats.assists += 1;
                    }
                }
            }
            StatsEvent::CourierKill { killer, owner } => {
                if let Some(stats) = self.players.get_or_create(killer) {
                    stats.courier_kills += 1;
                }
                let killer_name = game.player_name(killer).map(str::to_owned);
                let owner_name = game.player_name(owner).map(str::to_owned);
                match (killer_name, owner_name) {
                    (Some(killer_name), Some(owner_name)) => info!(
                        game = %self.game_name,
                        killer = %killer_name,
                        owner = %owner_name,
                        "courier killed"
                    ),
                    (None, Some(owner_name)) => match killer {
                        0 => info!(
                            game = %self.game_name,
                            owner = %owner_name,
                            "the Sentinel killed a courier"
                        ),
                        6 => info!(
                            game = %self.game_name,
                            owner = %owner_name,
                            "the Scourge killed a courier"
                        ),
                        _ => {}
                    },
                    _ => {}
                }
            }
            StatsEvent::TowerKill { killer, tower } => {
                if let Some(stats) = self.players.get_or_create(killer) {
                    stats.tower_kills += 1;
                }
                let description = format!("{},{},{}", tower.level, tower.alliance, tower.lane);
                if let Some(killer_name) = game.player_name(killer).map(str::to_owned) {
                    info!(
                        game = %self.game_name,
                        killer = %killer_name,
                        tower = %description,
                        "tower destroyed"
                    );
                    let ticket = sink.event_row(EventRow {
                        kind: EventKind::TowerKill,
                        game_name: self.game_name.clone(),
                        killer: killer_name,
                        victim: description,
                        killer_colour: killer,
                        victim_colour: 0,
                    });
                    self.tickets.push(ticket);
                } else {
                    match killer {
                        0 => info!(
                            game = %self.game_name,
                            tower = %description,
                            "the Sentinel destroyed a tower"
                        ),
                        6 => info!(
                            game = %self.game_name,
                            tower = %description,
                            "the Scourge destroyed a tower"
                        ),
                        _ => {}
                    }
                }
            }
            StatsEvent::RaxKill { killer, rax } => {
                if let Some(stats) = self.players.get_or_create(killer) {
                    stats.rax_kills += 1;
                }
                if let Some(killer_name) = game.player_name(killer) {
                    info!(
                        game = %self.game_name,
                        killer = %killer_name,
                        alliance = %rax.alliance,
                        lane = %rax.lane,
                        kind = %rax.kind,
                        "rax destroyed"
                    );
                } else {
                    match killer {
                        0 => info!(game = %self.game_name, "the Sentinel destroyed a rax"),
                        6 => info!(game = %self.game_name, "the Scourge destroyed a rax"),
                        _ => {}
                    }
                }
            }
            StatsEvent::ThroneHp(hp) => {
                info!(game = %self.game_name, hp, "Frozen Throne hit");
            }
            StatsEvent::TreeHp(hp) => {
                info!(game = %self.game_name, hp, "World Tree hit");
            }
            StatsEvent::PlayerLeft => {
                debug!(game = %self.game_name, "disconnect marker");
            }
            StatsEvent::CreepKills { colour, count } => {
                if let Some(stats) = self.players.get_or_create(colour) {
                    stats.creep_kills = count;
                }
            }
            StatsEvent::CreepDenies { colour, count } => {
                if let Some(stats) = self.players.get_or_create(colour) {
                    stats.creep_denies = count;
                }
            }
            StatsEvent::NeutralKills { colour, count } => {
                if let Some(stats) = self.players.get_or_create(colour) {
                    stats.neutral_kills = count;
                }
            }
            StatsEvent::GameStart => {
                self.resolver.mark_game_start(self.clock.now());
                info!(game = %self.game_name, "map sent GameStart");
            }
            StatsEvent::Winner(value) => {
                let edge = self.resolver.observe_winner(value);
                match value {
                    1 => info!(game = %self.game_name, "detected winner: Sentinel"),
                    2 => info!(game = %self.game_name, "detected winner: Scourge"),
                    _ => info!(game = %self.game_name, winner = value, "detected winner"),
                }
                return edge;
            }
            StatsEvent::ElapsedMin(min) => {
                self.resolver.set_minutes(min);
            }
            StatsEvent::ElapsedSec(sec) => {
                self.resolver.set_seconds(sec);
            }
            StatsEvent::Snapshot { colour, field } => {
                if let Some(team) = Team::from_colour(colour) {
                    game.assign_team(colour, team);
                }
                if let Some(stats) = self.players.get_or_create(colour) {
                    stats.colour = colour;
                    if let Some(field) = field {
                        match field {
                            Snapshot::CreepKills(count) => stats.creep_kills = count,
                            Snapshot::CreepDenies(count) => stats.creep_denies = count,
                            Snapshot::Gold(gold) => stats.gold = gold,
                            Snapshot::NeutralKills(count) => stats.neutral_kills = count,
                            Snapshot::Item { slot, code } => stats.items[slot.index()] = code,
                            Snapshot::Hero(code) => stats.hero = code,
                            Snapshot::Id(id) => stats.new_colour = id,
                        }
                    }
                }
            }
        }
        false
    }

    /// Validate the accumulated records and submit them to the sink: one
    /// game row, then one player row per surviving record. The game row is
    /// always submitted on success even when the game never properly
    /// finished (winner stays 0 and every player draws).
    ///
    /// A duplicate colour rejects the whole game and nothing is submitted.
    pub fn save(
        &mut self,
        game_id: u32,
        lobby_players: &[(u32, String)],
        sink: &mut S,
    ) -> Result<SaveSummary, SaveError> {
        let now = self.clock.now();
        let winner = self.resolver.winner();
        let duration = self.resolver.duration(now);
        let records = self.players.drain();

        let (game, players) =
            match crate::save::prepare_rows(game_id, records, winner, duration, lobby_players) {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(game = %self.game_name, %err, "game stats discarded");
                    return Err(err);
                }
            };

        let summary = SaveSummary {
            players: players.len(),
            winner,
            min: game.min,
            sec: game.sec,
        };
        info!(
            game = %self.game_name,
            winner,
            min = game.min,
            sec = game.sec,
            players = summary.players,
            "saving game stats"
        );

        let ticket = sink.game_row(game);
        self.tickets.push(ticket);
        for row in players {
            let ticket = sink.player_row(row);
            self.tickets.push(ticket);
        }
        Ok(summary)
    }
}
