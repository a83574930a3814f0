//! CLI command implementations
//!
//! Every command runs the real controller against the simulated engine and
//! reports what the controller asked the engine to do.

use crate::output::{emit, OutputFormat};
use anyhow::{bail, Context};
use kino_playback::{
    quality::rank_by_bitrate,
    quality_label, resolve_level,
    sim::{EngineCommand, SimulatedEngineFactory, SimulatedSink},
    ControllerConfig, EngineErrorData, ErrorType, Level, LevelSelection, MediaSink,
    PlaybackController, PlaybackOptions, PlaybackOptionsHandle, PlayerProps, SessionInfo,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Ladder used when `--ladder` is not given
const DEFAULT_LADDER: &str = "1080:6000000,720:3000000,720:2500000,480:1200000,0:128000";

/// Parse `height:bitrate` pairs separated by commas. Height 0 is audio-only.
pub fn parse_ladder(rungs: &str) -> anyhow::Result<Vec<Level>> {
    rungs.split(',')
        .map(str::trim)
        .filter(|rung| !rung.is_empty())
        .map(|rung| {
            let (height, bitrate) = rung
                .split_once(':')
                .with_context(|| format!("ladder rung '{}' is not height:bitrate", rung))?;
            let height: u32 = height.trim().parse().with_context(|| format!("bad height in '{}'", rung))?;
            let bitrate: u64 = bitrate.trim().parse().with_context(|| format!("bad bitrate in '{}'", rung))?;
            Ok(if height == 0 {
                Level::audio_only(bitrate)
            } else {
                Level::new(height, bitrate)
            })
        })
        .collect()
}

fn parse_error_type(kind: &str) -> anyhow::Result<ErrorType> {
    Ok(match kind.to_lowercase().as_str() {
        "network" => ErrorType::Network,
        "media" => ErrorType::Media,
        "key-system" | "keysystem" => ErrorType::KeySystem,
        "mux" => ErrorType::Mux,
        "other" => ErrorType::Other,
        other => bail!("unknown error type '{}' (network, media, key-system, mux, other)", other),
    })
}

/// Height argument: a number, or "auto"
pub fn parse_height(value: &str) -> anyhow::Result<Option<u32>> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    let height: u32 = value.parse().with_context(|| format!("bad height '{}'", value))?;
    Ok((height > 0).then_some(height))
}

fn load_props(src: &str, autoplay: bool, props: Option<PathBuf>) -> anyhow::Result<PlayerProps> {
    match props {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading props from {}", path.display()))?;
            let mut props = PlayerProps::from_json(&json)?;
            if !src.is_empty() {
                props.src = src.to_string();
            }
            props.autoplay |= autoplay;
            Ok(props)
        }
        None => Ok(PlayerProps::new(src).with_autoplay(autoplay)),
    }
}

/// Controller wired to simulated parts
struct Rig {
    factory: SimulatedEngineFactory,
    sink: SimulatedSink,
    options: PlaybackOptionsHandle,
    controller: PlaybackController,
}

impl Rig {
    fn new(factory: SimulatedEngineFactory, sink: SimulatedSink, props: PlayerProps, config: ControllerConfig) -> Self {
        let options = PlaybackOptionsHandle::new();
        let controller = PlaybackController::new(
            Arc::new(factory.clone()),
            Arc::new(sink.clone()),
            options.clone(),
            props,
            config,
        );
        Self {
            factory,
            sink,
            options,
            controller,
        }
    }

    async fn start(&mut self) {
        kino_playback::init();
        self.controller.mount();
        self.controller.process_pending().await;
    }

    fn report(&self) -> SessionReport {
        SessionReport {
            session: self.controller.session(),
            options: self.options.snapshot(),
            engines_created: self.factory.created(),
            commands: self.factory.log().commands(),
            direct_src: self.sink.src(),
            play_calls: self.sink.play_calls(),
            paused: self.sink.paused(),
        }
    }
}

/// Outcome of a command run
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub session: Option<SessionInfo>,
    pub options: PlaybackOptions,
    pub engines_created: usize,
    pub commands: Vec<EngineCommand>,
    pub direct_src: Option<String>,
    pub play_calls: usize,
    pub paused: bool,
}

fn print_report(report: &SessionReport) {
    match &report.session {
        Some(session) => {
            println!("Session: {}", session.id);
            println!("  Mode: {:?}", session.mode);
            println!("  State: {}", session.state);
            println!("  Generation: {}", session.generation);
        }
        None => println!("Session: none"),
    }

    if let Some(src) = &report.direct_src {
        println!("  Direct source: {}", src);
    }
    println!("  Play calls: {} (paused: {})", report.play_calls, report.paused);

    println!("\nQualities:");
    if report.options.qualities.is_empty() {
        println!("  (none)");
    }
    for height in &report.options.qualities {
        let marker = if report.options.current_quality == Some(*height) { "*" } else { " " };
        println!("  {} {}", marker, quality_label(*height));
    }

    println!("\nEngine commands ({} engines):", report.engines_created);
    for (i, command) in report.commands.iter().enumerate() {
        println!("  {}. {:?}", i + 1, command);
    }
}

/// Start a session and report where it settled
pub async fn play(
    src: &str,
    autoplay: bool,
    props: Option<PathBuf>,
    ladder: Option<String>,
    unsupported: bool,
    block_autoplay: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let props = load_props(src, autoplay, props)?;
    let factory = if unsupported {
        SimulatedEngineFactory::unsupported()
    } else {
        SimulatedEngineFactory::new(parse_ladder(ladder.as_deref().unwrap_or(DEFAULT_LADDER))?)
    };
    let sink = if block_autoplay {
        SimulatedSink::blocking_autoplay()
    } else {
        SimulatedSink::new()
    };

    let mut rig = Rig::new(factory, sink, props, ControllerConfig::default());
    rig.start().await;

    emit(&rig.report(), format, print_report)
}

/// Inject engine errors into a ready session and report the recovery
pub async fn fail(
    src: &str,
    kind: &str,
    count: u32,
    non_fatal: bool,
    reinit_limit: Option<u32>,
    ladder: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let error_type = parse_error_type(kind)?;
    let factory = SimulatedEngineFactory::new(parse_ladder(ladder.as_deref().unwrap_or(DEFAULT_LADDER))?);
    let config = ControllerConfig { reinit_limit };

    let mut rig = Rig::new(factory, SimulatedSink::new(), PlayerProps::new(src), config);
    rig.start().await;

    for attempt in 1..=count {
        let details = format!("injected failure {}", attempt);
        let error = if non_fatal {
            EngineErrorData::non_fatal(error_type, details)
        } else {
            EngineErrorData::fatal(error_type, details)
        };
        rig.factory
            .fail(error)
            .context("source played directly, there is no engine to fail")?;
        rig.controller.process_pending().await;
    }

    emit(&rig.report(), format, print_report)
}

/// Request a height and report the engine level it resolved to
pub async fn quality(
    src: &str,
    height: &str,
    ladder: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let desired = parse_height(height)?;
    let factory = SimulatedEngineFactory::new(parse_ladder(ladder.as_deref().unwrap_or(DEFAULT_LADDER))?);

    let mut rig = Rig::new(factory, SimulatedSink::new(), PlayerProps::new(src), ControllerConfig::default());
    rig.start().await;

    rig.options.request_quality(desired);
    rig.controller.process_pending().await;

    emit(&rig.report(), format, print_report)
}

/// Row of the ladder breakdown
#[derive(Debug, Serialize)]
pub struct LadderRow {
    pub engine_index: usize,
    pub height: Option<u32>,
    pub bitrate: u64,
    pub label: String,
}

/// Ladder breakdown: bitrate ranking and the quality menu it produces
#[derive(Debug, Serialize)]
pub struct LadderReport {
    pub ranked: Vec<LadderRow>,
    pub qualities: Vec<u32>,
    pub selections: Vec<(u32, LevelSelection)>,
}

/// Show how a ladder is ranked and which level each quality selects
pub fn ladder(rungs: &str, format: OutputFormat) -> anyhow::Result<()> {
    let levels = parse_ladder(rungs)?;
    let qualities = kino_playback::derive_qualities(&levels);

    let report = LadderReport {
        ranked: rank_by_bitrate(&levels)
            .into_iter()
            .map(|(engine_index, level)| LadderRow {
                engine_index,
                height: level.video_height(),
                bitrate: level.bitrate,
                label: level.video_height().map(quality_label).unwrap_or_else(|| "audio".to_string()),
            })
            .collect(),
        selections: qualities
            .iter()
            .map(|&height| (height, resolve_level(&levels, Some(height))))
            .collect(),
        qualities,
    };

    emit(&report, format, |report| {
        println!("Ladder ({} renditions, highest bitrate first):", report.ranked.len());
        for row in &report.ranked {
            println!("  [{}] {:>6} {}bps", row.engine_index, row.label, row.bitrate);
        }
        println!("\nQuality menu:");
        for (height, selection) in &report.selections {
            println!("  {:>6} -> level {}", quality_label(*height), selection);
        }
    })
}
