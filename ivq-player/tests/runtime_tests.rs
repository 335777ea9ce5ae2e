//! Runtime tests: engine task, simulated surface and tokio timers together
//!
//! All tests run on a paused clock, so countdowns and fades complete as soon
//! as every task is idle.

mod helpers;

use helpers::*;
use ivq_common::config::TimingConfig;
use ivq_common::events::{EventBus, PlaybackPhase, PlayerEvent};
use ivq_player::playback::simulated::{SimulatedMedia, SimulatedProbe, SimulatedSurface};
use ivq_player::runtime::{IntentOutcome, SubmitOutcome};
use ivq_player::{Error, PlayerHandle, PlayerRuntime, TriggerEngine, UserIntent};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

struct Running {
    handle: PlayerHandle,
    task: JoinHandle<TriggerEngine>,
    events: broadcast::Receiver<PlayerEvent>,
    probe: SimulatedProbe,
}

fn start(media: SimulatedMedia, questions: Vec<ivq_common::model::Question>) -> Running {
    let runtime = PlayerRuntime::new(768);
    let surface = SimulatedSurface::start(media, runtime.input());
    let probe = surface.probe();

    let bus = EventBus::new(4096);
    let events = bus.subscribe();
    let mut props = lesson(questions);
    props.chapters = vec![
        chapter(1, "Warm-up", 0.0, 10.0),
        chapter(2, "Practice", 10.0, 20.0),
    ];
    props.auto_play = true;

    let engine = TriggerEngine::new(
        props,
        TimingConfig::default(),
        Box::new(surface),
        Box::new(runtime.timers()),
        bus,
    );
    let handle = runtime.handle();
    let task = runtime.spawn(engine);
    Running {
        handle,
        task,
        events,
        probe,
    }
}

/// Wait (in virtual time) for the first event matching `pred`
async fn wait_for<F>(events: &mut broadcast::Receiver<PlayerEvent>, pred: F) -> PlayerEvent
where
    F: Fn(&PlayerEvent) -> bool,
{
    let found = tokio::time::timeout(Duration::from_secs(300), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await;
    found.expect("timed out waiting for event")
}

fn entered(phase: PlaybackPhase) -> impl Fn(&PlayerEvent) -> bool {
    move |e| matches!(e, PlayerEvent::PlaybackStateChanged { new_phase, .. } if *new_phase == phase)
}

#[tokio::test(start_paused = true)]
async fn test_session_runs_question_to_end() {
    let mut run = start(SimulatedMedia::new(20.0), vec![multiple_choice(1, 5.0, "b")]);

    let presented = wait_for(&mut run.events, |e| {
        matches!(e, PlayerEvent::QuestionPresented { .. })
    })
    .await;
    match presented {
        PlayerEvent::QuestionPresented { question_id, at_time, .. } => {
            assert_eq!(question_id, 1);
            assert!((at_time - 5.0).abs() < 0.5);
        }
        other => panic!("unexpected event {:?}", other),
    }
    let state = run.handle.state().await.unwrap();
    assert_eq!(state.phase, PlaybackPhase::QuestionActive);
    assert!(!run.probe.snapshot().playing);

    // Wrong first, then right
    run.handle
        .intent(UserIntent::SelectOption("a".to_string()))
        .await
        .unwrap();
    assert_eq!(
        run.handle.intent(UserIntent::Submit).await.unwrap(),
        IntentOutcome::Submitted(SubmitOutcome::Retry)
    );
    assert_eq!(
        run.handle
            .intent(UserIntent::SelectOption("b".to_string()))
            .await
            .unwrap(),
        IntentOutcome::Applied
    );
    assert_eq!(
        run.handle.intent(UserIntent::Submit).await.unwrap(),
        IntentOutcome::Submitted(SubmitOutcome::Accepted { is_correct: true })
    );

    // Countdown and fade-in complete on their own
    wait_for(&mut run.events, entered(PlaybackPhase::Resuming)).await;
    wait_for(&mut run.events, entered(PlaybackPhase::Playing)).await;
    assert_eq!(run.probe.snapshot().volume, 1.0);

    let ended = wait_for(&mut run.events, |e| {
        matches!(e, PlayerEvent::PlaybackEnded { .. })
    })
    .await;
    assert!(matches!(ended, PlayerEvent::PlaybackEnded { looped: false, .. }));

    run.handle.shutdown().unwrap();
    let engine = run.task.await.unwrap();
    assert_eq!(engine.state().score, 1);
    assert_eq!(engine.state().answered_count, 1);
    assert_eq!(engine.phase(), PlaybackPhase::PausedIdle);
    assert_eq!(engine.state().current_chapter_index, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_render_and_seek_through_handle() {
    let mut run = start(SimulatedMedia::new(20.0), vec![]);
    wait_for(&mut run.events, entered(PlaybackPhase::Playing)).await;

    let view = run.handle.render(400).await.unwrap();
    assert!(!view.loading);
    assert!(view.compact);
    assert_eq!(view.score_label, "0/0");
    assert!(view.controls.seek_bar);

    assert_eq!(
        run.handle.intent(UserIntent::Seek(15.0)).await.unwrap(),
        IntentOutcome::Applied
    );
    let state = run.handle.state().await.unwrap();
    assert!(state.current_time >= 15.0);
    assert_eq!(state.current_chapter_index, Some(1));

    // Queued intents are applied before later queries
    run.handle.intent_nowait(UserIntent::ToggleChaptersPanel).unwrap();
    let view = run.handle.render(1024).await.unwrap();
    assert_eq!(view.chapters.len(), 2);
    assert!(view.chapters[1].active);

    run.handle.shutdown().unwrap();
    run.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_leaves_player_inert() {
    let mut media = SimulatedMedia::new(20.0);
    media.fail_with = Some("404 Not Found".to_string());
    let mut run = start(media, vec![multiple_choice(1, 5.0, "b")]);

    let error = wait_for(&mut run.events, |e| {
        matches!(e, PlayerEvent::TransportError { .. })
    })
    .await;
    assert!(matches!(error, PlayerEvent::TransportError { ref message, .. } if message.contains("404")));

    let view = run.handle.render(1024).await.unwrap();
    assert!(view.loading);
    assert_eq!(view.error.as_deref(), Some("404 Not Found"));
    assert_eq!(
        run.handle.intent(UserIntent::TogglePlay).await.unwrap(),
        IntentOutcome::Ignored
    );

    run.handle.shutdown().unwrap();
    run.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_handle_reports_closed_runtime() {
    let run = start(SimulatedMedia::new(20.0), vec![]);
    let handle = run.handle.clone();

    run.handle.shutdown().unwrap();
    let engine = run.task.await.unwrap();
    drop(engine);

    assert!(matches!(handle.state().await, Err(Error::RuntimeClosed)));
    assert!(matches!(
        handle.intent(UserIntent::TogglePlay).await,
        Err(Error::RuntimeClosed)
    ));
}
