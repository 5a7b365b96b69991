//! Scheduler state machine driven against scripted collaborators

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use payseq_errors::{EngineError, Error, QueueError, SchedulerError};
use payseq_events::{
    channel, AppEvent, GeneralEvent, MediaEvent, OperationEvent, QueueEvent, RunEvent,
};
use payseq_sequencer::{
    simulate_operations, CancelToken, DriveMode, OperationStatus, RunState, Scheduler,
    SchedulerOptions, SwapChoice,
};
use payseq_types::{
    InstallerAction, MediaInfo, MediaType, OperationResult, Payload, PayloadId, ResultCode,
};
use support::{
    chain, code_of, install, remove, MemoryMedia, ScriptedAlerts, ScriptedEngine,
    ScriptedSimulation,
};

fn unattended() -> SchedulerOptions {
    SchedulerOptions {
        interactive: false,
        ..SchedulerOptions::default()
    }
}

fn find<'a>(payloads: &[&'a Payload], id: &str) -> &'a Payload {
    payloads.iter().find(|p| p.id.as_str() == id).unwrap()
}

/// Records total progress after every observer call
fn progress_log() -> (Arc<Mutex<Vec<f64>>>, impl FnMut(&OperationStatus) + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |status: &OperationStatus| {
        sink.lock().unwrap().push(status.total_progress());
    })
}

#[test]
fn test_run_to_completion() {
    let (log, observer) = progress_log();
    let mut scheduler = Scheduler::new(
        vec![
            install("y").with_required(["x"]),
            install("x").with_satisfied(["y"]),
        ],
        ScriptedEngine::new(),
        unattended(),
    )
    .with_observer(observer);

    let report = scheduler.run_blocking().unwrap();

    assert_eq!(scheduler.state(), RunState::Complete);
    assert_eq!(scheduler.engine().started_ids(), vec!["x", "y"]);
    assert_eq!(report.succeeded.len(), 2);
    assert!(report.is_success());
    assert!((report.total_progress - 100.0).abs() < f64::EPSILON);
    assert!(scheduler.status().operations_complete());

    let log = log.lock().unwrap();
    assert!(log.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(log.iter().filter(|p| **p >= 100.0).count(), 2);
    assert_eq!(log.last(), Some(&100.0));
}

#[test]
fn test_install_params_carry_media_and_size() {
    let mut options = unattended();
    options
        .properties
        .insert("INSTALLDIR".to_string(), "/opt/suite".to_string());

    let mut scheduler = Scheduler::new(
        vec![
            install("a").with_operation_size(2000),
            install("b").with_media(MediaInfo::fixed(2, "/srv/disk2", "Disk 2")),
        ],
        ScriptedEngine::new(),
        options,
    );
    scheduler.run_blocking().unwrap();

    let started = &scheduler.engine().started;
    assert_eq!(started[0].params.media_type, MediaType::Fixed);
    assert_eq!(started[0].params.media_volume_index, 1);
    assert_eq!(started[0].params.estimated_size_kb, 2);
    assert_eq!(started[0].params.properties["INSTALLDIR"], "/opt/suite");
    assert_eq!(started[1].params.media_path, "/srv/disk2");
    assert_eq!(started[1].params.media_volume_index, 2);
}

#[test]
fn test_dependency_failure_skips_dependents() {
    let mut scheduler = Scheduler::new(
        chain(InstallerAction::Install),
        ScriptedEngine::new().failing("a", 1603),
        unattended(),
    );
    let report = scheduler.run_blocking().unwrap();

    assert_eq!(scheduler.state(), RunState::Complete);
    assert_eq!(scheduler.engine().started_ids(), vec!["a"]);
    assert_eq!(report.failed.len(), 3);
    assert!(report
        .failed
        .iter()
        .all(|f| f.code == ResultCode(1603) && f.args == vec!["a".to_string()]));
}

#[test]
fn test_requirement_queued_after_dependent_is_not_success() {
    // d only lists c, so it sorts ahead of c and is passed over
    let (tx, mut rx) = channel();
    let mut scheduler = Scheduler::new(
        vec![
            install("x"),
            install("y"),
            install("c").with_required(["x", "y"]),
            install("d").with_required(["c"]),
        ],
        ScriptedEngine::new(),
        unattended(),
    )
    .with_events(tx);

    let report = scheduler.run_blocking().unwrap();

    assert_eq!(scheduler.state(), RunState::Complete);
    assert_eq!(scheduler.engine().started_ids(), vec!["x", "y", "c"]);
    assert_eq!(report.not_run, vec![PayloadId::from("d")]);
    assert!(report.failed.is_empty());
    assert!(!report.is_success());

    let mut warned = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let AppEvent::General(GeneralEvent::Warning { .. }) = message.event {
            warned.push(message.meta.correlation_id);
        }
    }
    assert_eq!(warned, vec![Some("d".to_string())]);
}

#[test]
fn test_cancel_between_operations() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let mut scheduler = Scheduler::new(
        chain(InstallerAction::Install),
        ScriptedEngine::new(),
        unattended(),
    )
    .with_cancel_signal(Arc::new(token))
    .with_observer(move |status: &OperationStatus| {
        if status.current_payload().map(|p| p.as_str()) == Some("a")
            && status.is_current_operation_complete()
        {
            trigger.cancel();
        }
    });

    let report = scheduler.run_blocking().unwrap();
    let payloads = scheduler.payloads();

    assert_eq!(scheduler.state(), RunState::Canceled);
    assert!(report.was_canceled);
    assert_eq!(scheduler.engine().started_ids(), vec!["a"]);
    assert_eq!(code_of(find(&payloads, "a")), Some(ResultCode::SUCCESS));
    assert_eq!(code_of(find(&payloads, "b")), Some(ResultCode::USER_CANCEL));
    assert_eq!(code_of(find(&payloads, "c")), Some(ResultCode::USER_CANCEL));
    assert_eq!(report.canceled.len(), 2);
}

#[test]
fn test_in_flight_operation_finishes_after_cancel() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let mut scheduler = Scheduler::new(
        vec![install("a"), install("b")],
        ScriptedEngine::new(),
        unattended(),
    )
    .with_cancel_signal(Arc::new(token))
    .with_observer(move |_: &OperationStatus| trigger.cancel());

    scheduler.run_blocking().unwrap();
    let payloads = scheduler.payloads();
    assert_eq!(code_of(find(&payloads, "a")), Some(ResultCode::SUCCESS));
    assert_eq!(code_of(find(&payloads, "b")), Some(ResultCode::USER_CANCEL));
}

#[test]
fn test_canceled_run_ejects_media() {
    let media = MemoryMedia::new();
    let token = CancelToken::new();
    let trigger = token.clone();
    let mut scheduler = Scheduler::new(removable_run(), ScriptedEngine::new(), unattended())
        .with_media_manager(Box::new(media.clone()))
        .with_cancel_signal(Arc::new(token))
        .with_observer(move |_: &OperationStatus| trigger.cancel());

    scheduler.run_blocking().unwrap();

    assert_eq!(scheduler.state(), RunState::Canceled);
    assert_eq!(scheduler.engine().started_ids(), vec!["a"]);
    assert_eq!(media.ejected(), vec!["/Volumes/Disk1/payloads"]);
}

#[test]
fn test_mixed_operations_abort_before_start() {
    let (tx, mut rx) = channel();
    let errors = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&errors);
    let mut scheduler = Scheduler::new(
        vec![install("a"), remove("b")],
        ScriptedEngine::new(),
        unattended(),
    )
    .with_events(tx)
    .with_observer(move |status: &OperationStatus| {
        if status.error().is_some() {
            *seen.lock().unwrap() += 1;
        }
    });

    let err = scheduler.run_blocking().unwrap_err();
    assert!(matches!(
        err,
        Error::Queue(QueueError::MixedOperations { .. })
    ));
    assert_eq!(scheduler.state(), RunState::Error);
    assert!(scheduler.engine().started.is_empty());
    assert_eq!(*errors.lock().unwrap(), 1);
    assert_eq!(scheduler.payloads().len(), 2);

    let first = rx.try_recv().unwrap();
    assert!(matches!(
        first.event,
        AppEvent::Queue(QueueEvent::OpenFailed { .. })
    ));
}

#[test]
fn test_start_failure_halts_run() {
    let mut scheduler = Scheduler::new(
        vec![
            install("a").with_satisfied(["b"]),
            install("b").with_required(["a"]),
        ],
        ScriptedEngine::new().fail_start("b"),
        unattended(),
    );

    let err = scheduler.run_blocking().unwrap_err();
    assert!(matches!(
        err,
        Error::Engine(EngineError::StartFailed { ref payload, .. }) if payload == "b"
    ));
    assert_eq!(scheduler.state(), RunState::Error);
    assert!(scheduler.status().error().is_some());
    assert_eq!(scheduler.status().current_payload().map(|p| p.as_str()), Some("b"));
    assert_eq!(scheduler.tick().unwrap(), RunState::Error);
}

#[test]
fn test_status_failure_halts_run() {
    let mut scheduler = Scheduler::new(
        vec![install("a"), install("b")],
        ScriptedEngine::new().fail_status(),
        unattended(),
    );
    assert_eq!(scheduler.start().unwrap(), RunState::Running);
    assert_eq!(scheduler.tick().unwrap(), RunState::Error);
    assert!(matches!(
        scheduler.status().error(),
        Some(Error::Engine(EngineError::StatusUnavailable { .. }))
    ));
    assert_eq!(scheduler.engine().started_ids(), vec!["a"]);
}

#[test]
fn test_start_and_tick_guards() {
    let mut scheduler = Scheduler::new(vec![install("a")], ScriptedEngine::new(), unattended());
    assert!(matches!(
        scheduler.tick().unwrap_err(),
        Error::Scheduler(SchedulerError::NotStarted)
    ));
    scheduler.start().unwrap();
    assert!(matches!(
        scheduler.start().unwrap_err(),
        Error::Scheduler(SchedulerError::AlreadyStarted)
    ));
}

#[test]
fn test_polls_until_engine_reports_done() {
    let mut scheduler = Scheduler::new(
        vec![install("a")],
        ScriptedEngine::new().with_script(
            "a",
            vec![
                OperationResult::running(10),
                OperationResult::running(10),
                OperationResult::running(60),
                OperationResult::succeeded(),
            ],
        ),
        unattended(),
    );
    scheduler.start().unwrap();
    for _ in 0..3 {
        assert_eq!(scheduler.tick().unwrap(), RunState::Running);
    }
    assert!((scheduler.status().total_progress() - 60.0).abs() < f64::EPSILON);
    assert_eq!(scheduler.tick().unwrap(), RunState::Complete);
    assert_eq!(scheduler.engine().polls, 4);
}

fn removable_run() -> Vec<Payload> {
    vec![
        install("a").with_media(MediaInfo::removable(1, "/Volumes/Disk1/payloads", "Disk 1")),
        install("b").with_media(MediaInfo::removable(2, "/Volumes/Disk2/payloads", "Disk 2")),
    ]
}

#[test]
fn test_swap_prompt_until_media_inserted() {
    let media = MemoryMedia::new();
    media.insert("/Volumes/Disk1/payloads");
    let alerts = ScriptedAlerts::new([SwapChoice::Ok, SwapChoice::Ok])
        .inserting(&media, "/Volumes/Disk2/payloads");

    let mut scheduler = Scheduler::new(removable_run(), ScriptedEngine::new(), SchedulerOptions::default())
        .with_media_manager(Box::new(media.clone()))
        .with_alert_presenter(Box::new(alerts.clone()));

    let report = scheduler.run_blocking().unwrap();
    assert!(report.is_success());
    assert_eq!(alerts.prompts(), vec!["Disk 2"]);
    // Disk 1 ejected before the prompt, Disk 2 at the end of the run
    assert_eq!(
        media.ejected(),
        vec!["/Volumes/Disk1/payloads", "/Volumes/Disk2/payloads"]
    );

    let status = scheduler.status();
    assert_eq!(status.media().current_relative_disk_index, 2);
    assert_eq!(status.media().media_count, 2);
    assert_eq!(status.media().current_media_name, "Disk 2");
}

#[test]
fn test_swap_finds_media_on_other_drive() {
    let media = MemoryMedia::new().with_drive("/media/usb1");
    media.insert("/Volumes/Disk1/payloads");
    media.insert("/media/usb1/payloads");
    let alerts = ScriptedAlerts::new([SwapChoice::Ok]);

    let mut scheduler = Scheduler::new(removable_run(), ScriptedEngine::new(), SchedulerOptions::default())
        .with_media_manager(Box::new(media))
        .with_alert_presenter(Box::new(alerts));
    scheduler.run_blocking().unwrap();

    let started = &scheduler.engine().started;
    assert_eq!(started[1].params.media_path, "/media/usb1/payloads");
    assert_eq!(started[1].params.media_name, "Disk 2");
}

#[test]
fn test_swap_cancel_cancels_run() {
    let media = MemoryMedia::new();
    media.insert("/Volumes/Disk1/payloads");
    let alerts = ScriptedAlerts::new([SwapChoice::Cancel]);

    let mut scheduler = Scheduler::new(
        removable_run(),
        ScriptedEngine::new(),
        SchedulerOptions::default(),
    )
    .with_media_manager(Box::new(media))
    .with_alert_presenter(Box::new(alerts));

    let report = scheduler.run_blocking().unwrap();
    assert_eq!(scheduler.state(), RunState::Canceled);
    assert_eq!(scheduler.engine().started_ids(), vec!["a"]);
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.canceled.len(), 1);
    assert!(scheduler.status().exit_requested());
}

#[test]
fn test_swap_prompt_repeats_while_media_missing() {
    let media = MemoryMedia::new();
    media.insert("/Volumes/Disk1/payloads");
    let alerts = ScriptedAlerts::new([SwapChoice::Ok, SwapChoice::Ok, SwapChoice::Ok])
        .inserting_after(&media, "/Volumes/Disk2/payloads", 2);

    let mut scheduler = Scheduler::new(removable_run(), ScriptedEngine::new(), SchedulerOptions::default())
        .with_media_manager(Box::new(media.clone()))
        .with_alert_presenter(Box::new(alerts.clone()));

    let report = scheduler.run_blocking().unwrap();
    assert!(report.is_success());
    assert_eq!(alerts.prompts(), vec!["Disk 2", "Disk 2"]);
    assert_eq!(
        scheduler.engine().started[1].params.media_path,
        "/Volumes/Disk2/payloads"
    );
    // Previous disk ejected before every prompt
    assert_eq!(
        media.ejected(),
        vec![
            "/Volumes/Disk1/payloads",
            "/Volumes/Disk1/payloads",
            "/Volumes/Disk2/payloads"
        ]
    );
}

#[test]
fn test_swap_without_prompt_host_installs_anyway() {
    let (tx, mut rx) = channel();
    let media = MemoryMedia::new();
    media.insert("/Volumes/Disk1/payloads");
    // No scripted answers: the prompt host reports itself unavailable
    let alerts = ScriptedAlerts::default();

    let mut scheduler = Scheduler::new(removable_run(), ScriptedEngine::new(), SchedulerOptions::default())
        .with_media_manager(Box::new(media.clone()))
        .with_alert_presenter(Box::new(alerts.clone()))
        .with_events(tx);

    let report = scheduler.run_blocking().unwrap();
    assert!(report.is_success());
    assert!(alerts.prompts().is_empty());
    assert_eq!(scheduler.engine().started_ids(), vec!["a", "b"]);
    assert_eq!(
        scheduler.engine().started[1].params.media_path,
        "/Volumes/Disk2/payloads"
    );
    // Nothing ejected ahead of a prompt that never happened
    assert_eq!(media.ejected(), vec!["/Volumes/Disk2/payloads"]);

    let mut swap_events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let AppEvent::Media(event) = message.event {
            swap_events.push(event);
        }
    }
    assert!(matches!(
        swap_events.first(),
        Some(MediaEvent::SwapRequired { media_name, .. }) if media_name == "Disk 2"
    ));
    assert!(!swap_events
        .iter()
        .any(|e| matches!(e, MediaEvent::SwapCanceled { .. } | MediaEvent::SwapResolved { .. })));
}

#[test]
fn test_unattended_runs_never_prompt() {
    let media = MemoryMedia::new();
    let alerts = ScriptedAlerts::new([SwapChoice::Cancel]);

    let mut scheduler = Scheduler::new(removable_run(), ScriptedEngine::new(), unattended())
        .with_media_manager(Box::new(media))
        .with_alert_presenter(Box::new(alerts.clone()));
    scheduler.run_blocking().unwrap();

    assert!(alerts.prompts().is_empty());
    assert_eq!(scheduler.engine().started_ids(), vec!["a", "b"]);
}

#[test]
fn test_removal_never_prompts() {
    let media = MemoryMedia::new();
    let alerts = ScriptedAlerts::new([SwapChoice::Cancel]);
    let payloads = vec![remove("a").with_media(MediaInfo::removable(1, "/Volumes/Disk1", "Disk 1"))];

    let mut scheduler = Scheduler::new(payloads, ScriptedEngine::new(), SchedulerOptions::default())
        .with_media_manager(Box::new(media))
        .with_alert_presenter(Box::new(alerts.clone()));
    scheduler.run_blocking().unwrap();
    assert!(alerts.prompts().is_empty());
}

#[test]
fn test_events_follow_run() {
    let (tx, mut rx) = channel();
    let mut scheduler = Scheduler::new(
        chain(InstallerAction::Install),
        ScriptedEngine::new().failing("b", 5),
        unattended(),
    )
    .with_events(tx);
    scheduler.run_blocking().unwrap();

    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        events.push(message);
    }

    assert!(matches!(
        events.first().map(|m| &m.event),
        Some(AppEvent::Queue(QueueEvent::Opened { .. }))
    ));
    assert!(events.iter().any(|m| matches!(
        &m.event,
        AppEvent::Queue(QueueEvent::DependentSkipped { payload, .. }) if payload.as_str() == "c"
    )));
    let started = events
        .iter()
        .find(|m| matches!(m.event, AppEvent::Operation(OperationEvent::Started { .. })))
        .unwrap();
    assert_eq!(started.meta.correlation_id.as_deref(), Some("a"));
    assert!(matches!(
        events.last().map(|m| &m.event),
        Some(AppEvent::Run(RunEvent::Completed {
            succeeded: 1,
            failed: 2,
            ..
        }))
    ));
    assert!(!events
        .iter()
        .any(|m| matches!(m.event, AppEvent::Media(MediaEvent::Ejected { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_interactive_run_waits_between_polls() {
    let mut scheduler = Scheduler::new(
        vec![install("a"), install("b")],
        ScriptedEngine::new(),
        unattended(),
    );

    let started = tokio::time::Instant::now();
    let report = scheduler
        .run(DriveMode::Interactive(Duration::from_millis(200)))
        .await
        .unwrap();

    assert!(report.is_success());
    // Three snapshots per payload, one poll per interval
    assert_eq!(scheduler.engine().polls, 6);
    assert!(started.elapsed() >= Duration::from_millis(1200));
}

#[tokio::test]
async fn test_unattended_run() {
    let mut scheduler = Scheduler::new(
        vec![install("a"), install("b"), install("c")],
        ScriptedEngine::new(),
        unattended(),
    );
    let mode = unattended().drive_mode();
    assert_eq!(mode, DriveMode::Unattended);

    let report = scheduler.run(mode).await.unwrap();
    assert_eq!(report.succeeded.len(), 3);
}

#[test]
fn test_options_from_config() {
    let config = payseq_config::Config::from_toml(
        r#"
        [scheduler]
        poll_interval_ms = 50
        unattended = true

        [media]
        prompt_for_swap = false
        removable_roots = ["/media/usb1"]

        [properties]
        INSTALLDIR = "/opt/suite"
        "#,
    )
    .unwrap();

    let options = SchedulerOptions::from_config(&config);
    assert_eq!(options.poll_interval, Duration::from_millis(50));
    assert!(!options.interactive);
    assert!(!options.prompt_for_swap);
    assert!(options.eject_on_complete);
    assert_eq!(options.removable_roots, vec!["/media/usb1"]);
    assert_eq!(options.properties["INSTALLDIR"], "/opt/suite");
    assert_eq!(options.drive_mode(), DriveMode::Unattended);
}

#[test]
fn test_simulation_propagates_failures() {
    let mut engine = ScriptedSimulation::default()
        .with_result("a", OperationResult::failed(ResultCode(42), Vec::new()));

    let results = simulate_operations(
        chain(InstallerAction::Install),
        &mut engine,
        &std::collections::BTreeMap::new(),
    )
    .unwrap();

    assert!(engine.opened && engine.closed);
    assert_eq!(engine.simulated.len(), 1);
    assert!(results
        .iter()
        .all(|p| code_of(p) == Some(ResultCode(42))));
}

#[test]
fn test_simulation_rejects_mixed_runs() {
    let mut engine = ScriptedSimulation::default();
    let err = simulate_operations(
        vec![install("a"), remove("b")],
        &mut engine,
        &std::collections::BTreeMap::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Queue(QueueError::MixedOperations { .. })));
    assert!(!engine.opened);
}
