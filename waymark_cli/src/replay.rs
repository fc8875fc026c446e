use std::{fs::File, io::BufReader, path::PathBuf};

use clap::Args;
use comfy_table::Table;
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;
use tracing::info;
use waymark_directions::{Coordinate, ReqwestTransport};
use waymark_session::{LocationFix, RouteSession, SessionConfig, SessionEvent, TracingMapView};

use crate::parsers;

#[derive(Args)]
pub struct ReplayArgs {
    /// JSON file holding the event log
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Wait for each admitted fetch before feeding the next event
    #[arg(short, long)]
    wait: bool,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayAction {
    Tap {
        latitude: f64,
        longitude: f64,
    },
    LongPress,
    Clear,
    UseCurrentLocation,
    Location {
        latitude: f64,
        longitude: f64,
        accuracy_meters: f64,
    },
}

#[derive(Deserialize, Debug, PartialEq)]
struct ReplayEntry {
    /// Offset from the start of the replay, e.g. "20s". Defaults to the
    /// previous entry's offset.
    #[serde(default)]
    at: Option<String>,

    #[serde(flatten)]
    action: ReplayAction,
}

impl ReplayAction {
    fn to_event(&self) -> anyhow::Result<SessionEvent> {
        Ok(match *self {
            ReplayAction::Tap {
                latitude,
                longitude,
            } => SessionEvent::Tap(Coordinate::new(latitude, longitude)?),
            ReplayAction::LongPress => SessionEvent::LongPress,
            ReplayAction::Clear => SessionEvent::Clear,
            ReplayAction::UseCurrentLocation => SessionEvent::UseCurrentLocation,
            ReplayAction::Location {
                latitude,
                longitude,
                accuracy_meters,
            } => SessionEvent::LocationUpdate(LocationFix {
                coordinate: Coordinate::new(latitude, longitude)?,
                accuracy_meters,
            }),
        })
    }
}

fn schedule(entries: &[ReplayEntry]) -> anyhow::Result<Vec<(SignedDuration, SessionEvent)>> {
    let mut offset = SignedDuration::ZERO;
    let mut events = Vec::with_capacity(entries.len());

    for entry in entries {
        if let Some(at) = &entry.at {
            let next = parsers::parse_duration(at).map_err(anyhow::Error::msg)?;
            if next < offset {
                anyhow::bail!("Event offsets must not go backwards ({} after {})", next, offset);
            }
            offset = next;
        }

        events.push((offset, entry.action.to_event()?));
    }

    Ok(events)
}

pub async fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let file = File::open(&args.input)?;
    let entries: Vec<ReplayEntry> = serde_json::from_reader(BufReader::new(file))?;
    let events = schedule(&entries)?;

    let config = SessionConfig::from_env()?;
    let mut session = RouteSession::new(&config, ReqwestTransport::new()?, TracingMapView);

    let base = Timestamp::now();
    for (offset, event) in events {
        if args.wait {
            for outcome in session.settle().await {
                info!("Fetch finished: {:?}", outcome);
            }
        } else {
            for outcome in session.process_ready_completions() {
                info!("Fetch finished: {:?}", outcome);
            }
        }

        let now = base.checked_add(offset)?;
        let outcome = session.handle_event(event, now);
        info!("+{} {:?} -> {:?}", offset, event, outcome);
    }

    for outcome in session.settle().await {
        info!("Fetch finished: {:?}", outcome);
    }

    let admission = session.admission();
    let mut table = Table::new();
    table.set_header(vec!["Start", "End", "Distance", "Duration", "Requests", "Remaining"]);
    table.add_row(vec![
        session
            .selection()
            .start()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        session
            .selection()
            .end()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        session
            .route_result()
            .map(|r| r.distance_label())
            .unwrap_or_default(),
        session
            .route_result()
            .map(|r| r.duration_label())
            .unwrap_or_default(),
        admission.state().request_count.to_string(),
        admission
            .remaining()
            .map(|left| left.to_string())
            .unwrap_or_else(|| "unguarded".to_string()),
    ]);
    println!("{table}");

    Ok(())
}
