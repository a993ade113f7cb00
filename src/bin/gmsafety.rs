use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use gmsafety::config::GmConfig;
use gmsafety::gm::GmSafety;
use gmsafety::hooks::SafetyHooks;
use gmsafety::{CanFrame, FrameError, SafetyMode, SafetySupervisor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const TICK_PERIOD_US: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Rx,
    Tx,
}

/// One line of a replay log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameRecord {
    dir: Direction,
    bus: u8,
    addr: u32,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
    /// Microsecond timestamp; the previous one is kept when absent.
    #[serde(default)]
    t: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Decision {
    line: usize,
    dir: Direction,
    bus: u8,
    addr: u32,
    len: usize,
    ok: bool,
    fwd: Option<u8>,
}

#[derive(Debug, Error)]
enum ReplayError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("line {line}: {source}")]
    Frame { line: usize, source: FrameError },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn param_arg() -> Arg<'static, 'static> {
    Arg::with_name("param")
        .long("param")
        .value_name("PARAM")
        .help("GM safety parameter (bit 0: camera harness, bit 1: camera longitudinal)")
        .takes_value(true)
        .default_value("0")
        .validator(|v| match v.parse::<u16>() {
            Ok(_) => Ok(()),
            Err(_) => Err("Parameter must be a 16-bit number".into()),
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("gmsafety")
        .version("0.1.0")
        .author("Vehicle Safety Engineering Team")
        .about("GM CAN interposer safety policy tools")
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("replay")
                .about("Replay a JSON-lines frame log through the GM safety model")
                .arg(
                    Arg::with_name("file")
                        .help("Frame log, one {\"dir\",\"bus\",\"addr\",\"data\",\"t\"} object per line")
                        .required(true),
                )
                .arg(param_arg()),
        )
        .subcommand(
            SubCommand::with_name("tables")
                .about("Show the allow list and address checks for a parameter value")
                .arg(param_arg()),
        )
        .get_matches();

    let format = matches.value_of("format").unwrap_or("table");

    match matches.subcommand() {
        ("replay", Some(sub_matches)) => handle_replay(sub_matches, format).await?,
        ("tables", Some(sub_matches)) => handle_tables(sub_matches, format)?,
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            println!("  {} Replay a frame log", "gmsafety replay <FILE>".bright_cyan());
            println!("  {} Show message tables", "gmsafety tables".bright_cyan());
        }
    }

    Ok(())
}

fn parse_param(matches: &ArgMatches<'_>) -> u16 {
    // clap validator guarantees the value parses
    matches
        .value_of("param")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

async fn handle_replay(matches: &ArgMatches<'_>, format: &str) -> Result<(), ReplayError> {
    let param = parse_param(matches);
    let path = matches.value_of("file").unwrap_or_default();

    let mut supervisor = SafetySupervisor::new();
    supervisor.set_safety_mode(SafetyMode::Gm, param);
    info!(path, param, "replaying frame log");

    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0;
    let mut last_tick_us = 0u32;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: FrameRecord = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
            line: line_number,
            source,
        })?;
        let frame = CanFrame::new(record.addr, record.bus, &record.data).map_err(|source| {
            ReplayError::Frame {
                line: line_number,
                source,
            }
        })?;

        if let Some(t) = record.t {
            // Housekeeping runs at 1 Hz on the log's own clock
            while t.wrapping_sub(last_tick_us) >= TICK_PERIOD_US {
                last_tick_us = last_tick_us.wrapping_add(TICK_PERIOD_US);
                supervisor.tick(last_tick_us);
            }
            supervisor.set_timestamp(t);
        }

        let (ok, fwd) = match record.dir {
            Direction::Rx => {
                let valid = supervisor.rx(&frame);
                (valid, supervisor.fwd(frame.bus(), &frame))
            }
            Direction::Tx => (supervisor.tx(&frame), None),
        };

        print_decision(
            &Decision {
                line: line_number,
                dir: record.dir,
                bus: frame.bus(),
                addr: frame.addr(),
                len: frame.len(),
                ok,
                fwd,
            },
            format,
        );
    }

    print_summary(&supervisor, format);
    Ok(())
}

fn print_decision(decision: &Decision, format: &str) {
    match format {
        "json" => {
            if let Ok(json) = serde_json::to_string(decision) {
                println!("{}", json);
            }
        }
        "compact" => {}
        _ => {
            let dir = match decision.dir {
                Direction::Rx => "RX".bright_blue(),
                Direction::Tx => "TX".bright_magenta(),
            };
            let verdict = match (decision.dir, decision.ok) {
                (Direction::Rx, true) => "valid".green(),
                (Direction::Rx, false) => "invalid".red(),
                (Direction::Tx, true) => "allowed".green(),
                (Direction::Tx, false) => "blocked".bright_red(),
            };
            let fwd = decision
                .fwd
                .map(|bus| format!(" -> bus {}", bus))
                .unwrap_or_default();

            println!(
                "{:>5} {} bus {} {:>#10x} len {:<2} {}{}",
                decision.line,
                dir,
                decision.bus,
                decision.addr,
                decision.len,
                verdict,
                fwd.dimmed()
            );
        }
    }
}

fn print_summary(supervisor: &SafetySupervisor, format: &str) {
    let stats = supervisor.stats();
    let state = supervisor.state();

    match format {
        "json" => {
            let summary = serde_json::json!({
                "stats": stats,
                "state": state,
            });
            println!("{}", summary);
        }
        _ => {
            println!();
            println!("{}", "Replay Summary".bright_blue().bold());
            println!("{} {} ({} invalid)", "RX frames:".bright_white(), stats.rx_frames, stats.rx_invalid);
            println!("{} {} ({} blocked)", "TX frames:".bright_white(), stats.tx_frames, stats.tx_blocked);
            println!("{} {}", "Forwarded:".bright_white(), stats.fwd_frames);
            println!("{} {}", "Controls allowed:".bright_white(), flag(state.controls_allowed));
            println!("{} {}", "Vehicle moving:".bright_white(), flag(state.vehicle_moving));
            println!("{} {}", "Gas pressed:".bright_white(), flag(state.gas_pressed));
            println!("{} {}", "Brake pressed:".bright_white(), flag(state.brake_pressed));
            println!("{} {}", "Interceptor:".bright_white(), flag(state.gas_interceptor_detected));
            println!("{} {}", "Relay malfunction:".bright_white(), flag(state.relay_malfunction));
        }
    }
}

fn flag(value: bool) -> ColoredString {
    if value {
        "yes".bright_green()
    } else {
        "no".dimmed()
    }
}

fn handle_tables(matches: &ArgMatches<'_>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let param = parse_param(matches);
    let mut gm = GmSafety::new();
    let addr_checks = gm.init(param);
    let config: &GmConfig = gm.config();

    if format == "json" {
        let tables = serde_json::json!({
            "config": config,
            "pcm_cruise": gm.pcm_cruise(),
            "tx_msgs": gm.tx_msgs(),
            "addr_checks": addr_checks,
        });
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    println!("{} {:?}", "Variant:".bright_white(), config.variant);
    println!("{} {}", "Stock cruise tracking:".bright_white(), flag(gm.pcm_cruise()));
    println!("{} {:?}", "Longitudinal limits:".bright_white(), config.long_limits);

    println!();
    println!("{}", "TX allow list".bright_blue().bold());
    for m in gm.tx_msgs() {
        println!("  bus {} {:>#10x} len {}", m.bus, m.addr, m.len);
    }

    println!();
    println!("{}", "RX address checks".bright_blue().bold());
    for check in addr_checks {
        for m in check.alternatives() {
            println!(
                "  bus {} {:>#10x} len {} every {} ms",
                m.bus,
                m.addr,
                m.len,
                m.expected_timestep_us / 1000
            );
        }
    }

    Ok(())
}
