//! Interactive video quiz player (ivq-player) - headless runner
//!
//! Plays a course schedule on a simulated playback surface, pausing at each
//! question and answering it from a scripted answers file or from stdin.
//! Progress is printed as playback advances; a summary is printed when the
//! media ends.
//!
//! ```text
//! ivq-player --schedule course.json --answers answers.json --speed 8
//! ```
//!
//! The answers file maps question ids to the answers to try, in order:
//!
//! ```json
//! { "1": ["a", "b"], "2": ["Paris"], "3": ["4"] }
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ivq_common::config::PlayerConfig;
use ivq_common::events::{EventBus, PlayerEvent};
use ivq_common::human_time::format_clock_pair;
use ivq_common::model::{PlayerProps, ProgressSnapshot, QuestionId, QuestionType};
use ivq_player::playback::simulated::{SimulatedMedia, SimulatedSurface};
use ivq_player::playback::validate_schedule;
use ivq_player::{PlayerHandle, PlayerRuntime, TriggerEngine, UserIntent};
use ivq_player::runtime::{IntentOutcome, SubmitOutcome};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ivq-player
#[derive(Parser, Debug)]
#[command(name = "ivq-player")]
#[command(about = "Headless interactive video quiz player")]
#[command(version)]
struct Args {
    /// Player props JSON (videoUrl, chapters, questions, ...)
    #[arg(short, long, env = "IVQ_SCHEDULE")]
    schedule: PathBuf,

    /// Configuration file (overrides IVQ_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scripted answers JSON; questions without scripted answers read stdin
    #[arg(short, long)]
    answers: Option<PathBuf>,

    /// Simulated playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Simulated media length in seconds (defaults to the end of the schedule)
    #[arg(long)]
    duration: Option<f64>,

    /// Viewport width reported to the presentation layer (pixels)
    #[arg(long, default_value_t = 1024)]
    viewport_width: u32,

    /// Skip the countdown-to-continue after each accepted answer
    #[arg(long)]
    skip_countdown: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config)?;

    info!(
        "ivq-player {} ({}, built {} [{}])",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        "Countdown {}s, resume fade {} over {} ms",
        config.timing.countdown_secs, config.timing.fade_curve, config.timing.fade_duration_ms
    );

    let mut props = load_props(&args.schedule)?;
    let duration = args.duration.unwrap_or_else(|| schedule_end(&props));
    validate_schedule(&props.chapters, &props.questions, Some(duration))
        .context("Invalid schedule")?;
    if !props.auto_play {
        info!("Enabling autoPlay for headless run");
        props.auto_play = true;
    }

    let mut answers = AnswerSource::new(match &args.answers {
        Some(path) => load_answers(path)?,
        None => HashMap::new(),
    });

    let question_types: HashMap<QuestionId, QuestionType> = props
        .questions
        .iter()
        .map(|q| (q.id, q.question_type()))
        .collect();
    let total_questions = props.questions.len();

    let runtime = PlayerRuntime::new(config.display.compact_breakpoint_px);
    let surface = SimulatedSurface::start(
        SimulatedMedia::new(duration).with_speed(args.speed),
        runtime.input(),
    );
    let bus = EventBus::default();
    let bus_capacity = bus.capacity();
    let mut events = bus.subscribe();
    let engine = TriggerEngine::new(
        props,
        config.timing.clone(),
        Box::new(surface),
        Box::new(runtime.timers()),
        bus,
    );
    let handle = runtime.handle();
    let task = runtime.spawn(engine);

    println!(
        "Playing {:.0}s of media at {}x ({} questions)",
        duration, args.speed, total_questions
    );

    let mut printer = ProgressPrinter::default();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = &mut shutdown => break,
        };
        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    "Event output lagged; skipped {} events (capacity {})",
                    skipped, bus_capacity
                );
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            PlayerEvent::ProgressUpdated { snapshot, .. } => printer.print(&snapshot),
            PlayerEvent::QuestionPresented { question_id, .. } => {
                let question_type = question_types
                    .get(&question_id)
                    .copied()
                    .with_context(|| format!("Presented unknown question {}", question_id))?;
                answer_question(
                    &handle,
                    &mut answers,
                    question_id,
                    question_type,
                    args.viewport_width,
                )
                .await?;
                if args.skip_countdown {
                    handle.intent_nowait(UserIntent::Continue)?;
                }
            }
            PlayerEvent::ChapterChanged { new_index, .. } => {
                if let Some(index) = new_index {
                    let view = handle.render(args.viewport_width).await?;
                    println!(
                        "-- Chapter {}: {}",
                        index + 1,
                        view.chapter_title.unwrap_or_default()
                    );
                }
            }
            PlayerEvent::BranchTaken { question_id, bucket, jump_to, .. } => {
                println!("-- Question {} branches ({:?}) to {:.1}s", question_id, bucket, jump_to);
            }
            PlayerEvent::TransportError { message, .. } => {
                error!("Transport error: {}", message);
                let state = handle.state().await?;
                if state.loading_error.is_some() {
                    handle.shutdown()?;
                    let _ = task.await;
                    bail!("Media failed to load: {}", message);
                }
            }
            PlayerEvent::PlaybackEnded { looped, .. } => {
                if !looped {
                    break;
                }
                println!("-- Looping");
            }
            _ => {}
        }
    }

    handle.shutdown()?;
    let engine = task.await.context("Player task failed")?;
    print_summary(&engine);
    Ok(())
}

fn init_tracing(config: &PlayerConfig) -> Result<()> {
    let default_filter = format!(
        "ivq_player={level},ivq_common={level}",
        level = config.logging.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let (file_layer, stderr_layer) = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file));
            (Some(layer), None)
        }
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn load_props(path: &Path) -> Result<PlayerProps> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schedule {}", path.display()))?;
    PlayerProps::from_json(&json)
        .with_context(|| format!("Failed to parse schedule {}", path.display()))
}

fn load_answers(path: &Path) -> Result<HashMap<QuestionId, VecDeque<String>>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers {}", path.display()))?;
    let raw: HashMap<String, Vec<String>> =
        serde_json::from_str(&json).context("Answers file must map question ids to answer lists")?;

    raw.into_iter()
        .map(|(id, answers)| {
            let id: QuestionId = id
                .parse()
                .with_context(|| format!("Invalid question id '{}' in answers file", id))?;
            Ok((id, answers.into()))
        })
        .collect()
}

/// Media length implied by the schedule
fn schedule_end(props: &PlayerProps) -> f64 {
    let chapters_end = props.chapters.iter().map(|c| c.end_time).fold(0.0, f64::max);
    let last_trigger = props
        .questions
        .iter()
        .map(|q| q.trigger_time + 1.0)
        .fold(0.0, f64::max);
    chapters_end.max(last_trigger).max(1.0)
}

/// Scripted answers with a stdin fallback
struct AnswerSource {
    scripted: HashMap<QuestionId, VecDeque<String>>,
    stdin: Option<Lines<BufReader<Stdin>>>,
}

impl AnswerSource {
    fn new(scripted: HashMap<QuestionId, VecDeque<String>>) -> Self {
        Self {
            scripted,
            stdin: Some(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Next answer to try for `id`; `None` once stdin is exhausted
    async fn next(&mut self, id: QuestionId) -> Result<Option<String>> {
        if let Some(answer) = self.scripted.get_mut(&id).and_then(|q| q.pop_front()) {
            println!("> {}", answer);
            return Ok(Some(answer));
        }
        let Some(lines) = self.stdin.as_mut() else {
            return Ok(None);
        };
        match lines.next_line().await.context("Failed to read stdin")? {
            Some(line) => Ok(Some(line)),
            None => {
                self.stdin = None;
                Ok(None)
            }
        }
    }
}

/// Intent that enters `answer` into the open question
fn answer_intent(question_type: QuestionType, answer: String) -> Option<UserIntent> {
    match question_type {
        QuestionType::MultipleChoice => Some(UserIntent::SelectOption(answer.trim().to_string())),
        QuestionType::TextInput | QuestionType::Essay => Some(UserIntent::SetText(answer)),
        QuestionType::Rating => answer.trim().parse().ok().map(UserIntent::SelectRating),
    }
}

async fn answer_question(
    handle: &PlayerHandle,
    answers: &mut AnswerSource,
    question_id: QuestionId,
    question_type: QuestionType,
    viewport_width: u32,
) -> Result<()> {
    loop {
        let view = handle.render(viewport_width).await?;
        if let Some(overlay) = &view.overlay {
            print!("\n{}", overlay.render_text());
        }

        let Some(answer) = answers.next(question_id).await? else {
            bail!("No answer available for question {}", question_id);
        };

        let applied = match answer_intent(question_type, answer) {
            Some(intent) => handle.intent(intent).await?,
            None => IntentOutcome::Ignored,
        };
        if applied != IntentOutcome::Applied {
            println!("  (answer not usable for this question)");
            continue;
        }

        match handle.intent(UserIntent::Submit).await? {
            IntentOutcome::Submitted(SubmitOutcome::Accepted { is_correct }) => {
                let view = handle.render(viewport_width).await?;
                let verdict = if question_type.is_graded() {
                    if is_correct { "Correct" } else { "Incorrect" }
                } else {
                    "Submitted"
                };
                println!("  {} (score {})", verdict, view.score_label);
                if let Some(feedback) = view.overlay.and_then(|o| o.feedback) {
                    println!("  {}", feedback);
                }
                return Ok(());
            }
            IntentOutcome::Submitted(SubmitOutcome::Retry) => println!("  Incorrect, try again"),
            _ => println!("  (answer not accepted)"),
        }
    }
}

/// Prints a progress line per 10% of playback and on score changes
#[derive(Default)]
struct ProgressPrinter {
    last: Option<(u32, u32, u32)>,
}

impl ProgressPrinter {
    fn print(&mut self, snapshot: &ProgressSnapshot) {
        let key = (
            (snapshot.percent / 10.0).floor() as u32,
            snapshot.score,
            snapshot.answered_count,
        );
        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);
        println!(
            "[{}] {:5.1}%  score {}/{}  answered {}",
            format_clock_pair(snapshot.current_time, snapshot.duration),
            snapshot.percent,
            snapshot.score,
            snapshot.total_questions,
            snapshot.answered_count
        );
    }
}

fn print_summary(engine: &TriggerEngine) {
    let state = engine.state();
    println!();
    println!(
        "Finished: score {} of {} questions, {} answered",
        state.score,
        engine.schedule().questions().len(),
        state.answered_count
    );
    let mut ids: Vec<_> = state.answers_by_id.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        if let Some(answer) = state.answers_by_id.get(&id) {
            println!(
                "  Q{} [{}] at {:.1}s: {}",
                id, answer.question_type, answer.timestamp_seconds, answer.answer
            );
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
