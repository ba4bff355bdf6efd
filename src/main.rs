use dota_stats_parser::{valid_colour, DotaStats, MemorySink, PlayerSource, Team};
use main_error::MainError;
use std::convert::TryInto;
use std::env::args;
use std::fs;
use std::io::stdout;

/// W3 slot colour names, indexed by player colour.
const COLOUR_NAMES: [&str; 12] = [
    "", "blue", "teal", "purple", "yellow", "orange", "", "green", "red", "pink", "gray", "brown",
];

/// Stand-in lobby that names every valid colour, so kill attribution works
/// when replaying a recorded action dump without live player sessions.
struct Roster;

impl PlayerSource for Roster {
    fn player_name(&self, colour: u32) -> Option<&str> {
        if valid_colour(colour) {
            Some(COLOUR_NAMES[colour as usize])
        } else {
            None
        }
    }

    fn assign_team(&mut self, _colour: u32, _team: Team) {}
}

/// Replays an action dump (u32 little-endian length before each action blob)
/// through a stats session and prints every row it would have persisted.
fn main() -> Result<(), MainError> {
    tracing_subscriber::fmt::init();

    let path = args().nth(1).expect("no action dump provided");
    let data = fs::read(path)?;

    let mut session = DotaStats::<MemorySink>::new("replay");
    let mut sink = MemorySink::new();
    let mut roster = Roster;

    let mut offset = 0;
    while offset + 4 <= data.len() {
        let len = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
        offset += 4;
        let end = (offset + len).min(data.len());
        session.process_action(&data[offset..end], &mut roster, &mut sink);
        offset = end;
    }

    let lobby: Vec<(u32, String)> = (1..12)
        .filter(|colour| valid_colour(*colour))
        .map(|colour| (colour, COLOUR_NAMES[colour as usize].to_string()))
        .collect();
    session.save(0, &lobby, &mut sink)?;

    serde_json::to_writer_pretty(stdout().lock(), &sink)?;
    Ok(())
}
