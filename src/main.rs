use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing::warn;

use streamrec::catalog::{CollectionVersion, Snapshot, SubmissionGate};
use streamrec::gateway::types::{NewRecording, Recording, RecordingFilter, RecordingPatch};
use streamrec::gateway::GatewayClient;
use streamrec::interval::{self, RecordingDraft};
use streamrec::lifecycle::{self, RecordingStatus};
use streamrec::session::{AdaptiveClient, MediaSurface, PlaybackHost, StreamSessionManager};
use streamrec::sync::do_sync;
use streamrec::timezone::{self, ZonedWallClock};

#[derive(Parser)]
#[command(name = "streamrec", about = "schedule recordings of live streams")]
pub struct Cli {
    /// Backend base URL; falls back to STREAMREC_API_URL.
    #[arg(long)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List channels.
    Channels,
    /// List the IANA zone names the backend accepts.
    Zones,
    /// List recordings, optionally filtered.
    Recordings {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        channel: Option<String>,
    },
    /// Schedule a recording. Times are wall-clock `YYYY-MM-DD HH:MM`, read
    /// in the channel's zone unless --zone says otherwise.
    Schedule {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        zone: Option<String>,
    },
    /// Edit a scheduled recording's title or interval.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        zone: Option<String>,
    },
    /// Cancel an in-progress recording, or delete any other one.
    Remove { id: String },
    /// Show a recording's interval in channel time, UTC, and another zone.
    Times {
        id: String,
        #[arg(long)]
        zone: Option<String>,
    },
    /// Probe stream playback for a channel from this host.
    Preview { channel: String },
}

pub fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = cli
        .api_url
        .or_else(|| std::env::var("STREAMREC_API_URL").ok())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let client = GatewayClient::new(base);

    match cli.command {
        Command::Channels => {
            let channels = do_sync(client.list_channels())?;
            for channel in channels {
                println!(
                    "{}  {}  [{}]  {}",
                    channel.id, channel.name, channel.timezone, channel.m3u8_url
                );
            }
        }
        Command::Zones => {
            for zone in do_sync(client.list_timezone_names())? {
                println!("{zone}");
            }
        }
        Command::Recordings { status, channel } => {
            let filter = RecordingFilter {
                channel_id: channel,
                status: status.as_deref().map(parse_status).transpose()?,
            };
            for recording in do_sync(client.list_recordings(&filter))? {
                print_recording(&recording);
            }
        }
        Command::Schedule {
            channel,
            title,
            start,
            end,
            zone,
        } => {
            let channel = do_sync(client.get_channel(&channel))?;
            let zone = zone.unwrap_or_else(|| channel.timezone.clone());

            let draft = RecordingDraft {
                channel_id: channel.id.clone(),
                title,
                start: parse_wall(&start, &zone)?,
                end: parse_wall(&end, &zone)?,
            };
            let validated = interval::validate(&draft)?;

            let mut gate = SubmissionGate::new();
            let mut recordings_version = CollectionVersion::new();
            gate.begin()?;
            let created = do_sync(client.create_recording(&NewRecording {
                channel_id: draft.channel_id.clone(),
                title: draft.title.clone(),
                start_time: validated.start,
                end_time: validated.end,
            }))?;
            gate.finish();
            recordings_version.bump();

            println!(
                "scheduled {}: {} .. {} ({})",
                created.id, created.start_time, created.end_time, zone
            );

            // Wholesale refresh after the confirmed mutation.
            let listing = Snapshot::capture(
                &recordings_version,
                do_sync(client.list_recordings(&RecordingFilter::default()))?,
            );
            for recording in &listing.items {
                print_recording(recording);
            }
        }
        Command::Edit {
            id,
            title,
            start,
            end,
            zone,
        } => {
            let recording = do_sync(client.get_recording(&id))?;
            // Guard first: a non-scheduled recording never reaches the wire.
            lifecycle::guard_edit(recording.status)?;

            let channel = do_sync(client.get_channel(&recording.channel_id))?;
            let zone = zone.unwrap_or_else(|| channel.timezone.clone());

            let draft = RecordingDraft {
                channel_id: recording.channel_id.clone(),
                title: title.unwrap_or_else(|| recording.title.clone()),
                start: match &start {
                    Some(s) => parse_wall(s, &zone)?,
                    None => timezone::to_zoned_wall_clock(recording.start_time, &zone)?,
                },
                end: match &end {
                    Some(s) => parse_wall(s, &zone)?,
                    None => timezone::to_zoned_wall_clock(recording.end_time, &zone)?,
                },
            };
            let validated = interval::validate(&draft)?;

            let updated = do_sync(client.update_recording(
                &id,
                &RecordingPatch {
                    title: Some(draft.title),
                    start_time: Some(validated.start),
                    end_time: Some(validated.end),
                },
            ))?;
            print_recording(&updated);
        }
        Command::Remove { id } => {
            let recording = do_sync(client.get_recording(&id))?;
            let action = lifecycle::removal_action(recording.status);
            do_sync(client.delete_recording(&id))?;
            println!("{} \"{}\": done", action.label(), recording.title);
        }
        Command::Times { id, zone } => {
            let conversion = do_sync(client.convert_recording_time(&id))?;
            if !conversion.agrees_with_local_engine()? {
                warn!("backend conversion disagrees with the local engine");
            }
            println!(
                "channel ({}):  {} - {}",
                conversion.channel_timezone,
                conversion.channel_start_time,
                conversion.channel_end_time
            );
            println!(
                "utc:           {} - {}",
                conversion.utc_start_time.format("%Y-%m-%d %H:%M"),
                conversion.utc_end_time.format("%Y-%m-%d %H:%M")
            );
            if let Some(zone) = zone {
                println!(
                    "{zone}:  {} - {}",
                    timezone::format_in_zone(conversion.utc_start_time, &zone)?,
                    timezone::format_in_zone(conversion.utc_end_time, &zone)?
                );
            }
        }
        Command::Preview { channel } => {
            let channel = do_sync(client.get_channel(&channel))?;
            let mut host = HeadlessHost;
            let mut sessions = StreamSessionManager::new();
            sessions.open(&channel.m3u8_url, &mut host);
            match sessions.error_banner() {
                Some((reason, url)) => println!("{reason} ({url})"),
                None => println!("connecting to {}", channel.m3u8_url),
            }
            sessions.close();
        }
    }

    Ok(())
}

/// This binary has no decoder, so a preview session always takes the
/// capability-unsupported branch; the host handles are never requested.
struct HeadlessHost;

impl PlaybackHost for HeadlessHost {
    fn supports_native_hls(&self) -> bool {
        false
    }

    fn supports_adaptive(&self) -> bool {
        false
    }

    fn surface(&mut self) -> Box<dyn MediaSurface> {
        unreachable!("headless host advertises no playback capability")
    }

    fn adaptive_client(&mut self) -> Box<dyn AdaptiveClient> {
        unreachable!("headless host advertises no playback capability")
    }
}

fn parse_wall(input: &str, zone: &str) -> anyhow::Result<ZonedWallClock> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M")
        .with_context(|| format!("expected YYYY-MM-DD HH:MM, got {input:?}"))?;
    Ok(ZonedWallClock::new(naive.date(), naive.time(), zone))
}

fn parse_status(input: &str) -> anyhow::Result<RecordingStatus> {
    match serde_json::from_value(serde_json::Value::String(input.to_string())) {
        Ok(status) => Ok(status),
        Err(_) => bail!(
            "unknown status {input:?}; expected scheduled, recording, completed, failed or cancelled"
        ),
    }
}

fn print_recording(recording: &Recording) {
    println!(
        "{}  {:?}  {} .. {}  {}",
        recording.id,
        recording.status,
        recording.start_time.format("%Y-%m-%d %H:%M"),
        recording.end_time.format("%Y-%m-%d %H:%M"),
        recording.title
    );
}
