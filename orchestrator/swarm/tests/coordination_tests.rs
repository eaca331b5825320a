// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the coordination core.
//!
//! Exercises the shared primitives under real concurrency (multi-threaded
//! runtime) and runs the default two-vehicle mission end to end:
//! - FIFO delivery and no lost batches with many producers
//! - exactly-once completion and worker termination
//! - mutual exclusion and blocking behavior of cell reservations
//! - cancellation of every suspension point

use fieldwatch_core::application::{spawn_vehicle, Vehicle, VehicleHandle};
use fieldwatch_core::domain::agent::{AgentId, AgentIdAllocator, Position};
use fieldwatch_core::domain::evaluation::ThresholdEvaluator;
use fieldwatch_core::domain::mission_config::{MissionManifest, TimingConfig};
use fieldwatch_core::domain::sensor::{MeasurementBatch, MeasurementSink};
use fieldwatch_core::domain::terrain::{Field, Terrain};
use fieldwatch_swarm::application::{AnalysisLog, AnalysisWorker, ControlCenter, WorkerState};
use fieldwatch_swarm::{CellReservation, CompletionCoordinator, MeasurementChannel, SwarmError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn batch(agent: u32, seq: i32) -> MeasurementBatch {
    MeasurementBatch::new(AgentId(agent), Position::new(seq, agent as i32), vec![])
}

struct Mission {
    field: Arc<Field>,
    completion: Arc<CompletionCoordinator>,
    channel: Arc<MeasurementChannel>,
    log: Arc<AnalysisLog>,
    center: Arc<ControlCenter>,
    vehicles: Vec<VehicleHandle>,
    cancel: CancellationToken,
}

fn setup(manifest: &MissionManifest) -> Mission {
    let field = Arc::new(manifest.build_field().unwrap());
    let cancel = CancellationToken::new();
    let completion = Arc::new(CompletionCoordinator::new(manifest.spec.vehicles.len()));
    let channel = Arc::new(MeasurementChannel::new(completion.clone()));
    let reservations = Arc::new(CellReservation::new());
    let center = Arc::new(ControlCenter::new(
        field.bounds(),
        reservations,
        completion.clone(),
        cancel.clone(),
    ));

    let ids = AgentIdAllocator::new();
    let sink: Arc<dyn MeasurementSink> = channel.clone();
    let vehicles = manifest
        .spec
        .vehicles
        .iter()
        .map(|spec| {
            let vehicle = Vehicle::new(
                ids.allocate(),
                spec,
                manifest.spec.battery,
                TimingConfig::instant(),
                field.clone(),
            )
            .unwrap();
            let (handle, _task) = spawn_vehicle(vehicle, sink.clone(), cancel.clone());
            center.register(&handle).unwrap();
            handle
        })
        .collect();

    Mission {
        field,
        completion,
        channel,
        log: Arc::new(AnalysisLog::new()),
        center,
        vehicles,
        cancel,
    }
}

async fn run(mission: &Mission, work: Vec<Vec<Position>>) {
    let worker = AnalysisWorker::new(
        mission.channel.clone(),
        mission.field.clone(),
        Arc::new(ThresholdEvaluator::default()),
        mission.log.clone(),
    );
    let analysis = worker.start(mission.cancel.clone());

    let mut tasks = Vec::new();
    for (vehicle, targets) in mission.vehicles.iter().cloned().zip(work) {
        let center = mission.center.clone();
        tasks.push(tokio::spawn(async move {
            center.run_work_list(&vehicle, &targets).await
        }));
    }
    for task in tasks {
        let report = task.await.unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.failures, 0);
    }

    tokio::time::timeout(Duration::from_secs(10), analysis)
        .await
        .expect("analysis worker must stop after collection completes")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_single_producer_fifo() {
    let channel = MeasurementChannel::new(Arc::new(CompletionCoordinator::new(1)));
    let cancel = CancellationToken::new();
    for seq in 0..50 {
        channel.push(batch(1, seq));
    }
    channel.completion().mark_agent_done();

    let mut popped = Vec::new();
    while let Some(batch) = channel.pop(&cancel).await.unwrap() {
        popped.push(batch.position.x);
    }
    assert_eq!(popped, (0..50).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_producers_no_lost_data_and_per_producer_order() {
    const PRODUCERS: u32 = 8;
    const PER_PRODUCER: i32 = 200;

    let completion = Arc::new(CompletionCoordinator::new(PRODUCERS as usize));
    let channel = Arc::new(MeasurementChannel::new(completion.clone()));
    let cancel = CancellationToken::new();

    let consumer = {
        let channel = channel.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut seen: HashMap<u32, Vec<i32>> = HashMap::new();
            while let Some(batch) = channel.pop(&cancel).await.unwrap() {
                seen.entry(batch.agent_id.0).or_default().push(batch.position.x);
            }
            seen
        })
    };

    let mut producers = Vec::new();
    for agent in 0..PRODUCERS {
        let channel = channel.clone();
        let completion = completion.clone();
        producers.push(tokio::spawn(async move {
            for seq in 0..PER_PRODUCER {
                channel.push(batch(agent, seq));
                if seq % 16 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            completion.mark_agent_done()
        }));
    }

    let mut zero_crossings = 0;
    for producer in producers {
        if producer.await.unwrap() {
            zero_crossings += 1;
        }
    }
    assert_eq!(zero_crossings, 1);

    let seen = tokio::time::timeout(Duration::from_secs(10), consumer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.len(), PRODUCERS as usize);
    for sequence in seen.values() {
        assert_eq!(sequence, &(0..PER_PRODUCER).collect::<Vec<_>>());
    }
    assert!(channel.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_terminates_and_sets_analysis_complete_once() {
    let field = Arc::new(MissionManifest::default().build_field().unwrap());
    let completion = Arc::new(CompletionCoordinator::new(3));
    let channel = Arc::new(MeasurementChannel::new(completion.clone()));
    let worker = AnalysisWorker::new(
        channel.clone(),
        field,
        Arc::new(ThresholdEvaluator::default()),
        Arc::new(AnalysisLog::new()),
    );
    let mut states = worker.subscribe_state();
    let handle = worker.start(CancellationToken::new());

    for agent in 0..3 {
        for seq in 0..5 {
            channel.push(batch(agent, seq));
        }
        assert!(!completion.is_analysis_complete());
        completion.mark_agent_done();
    }

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.batches_analyzed + summary.batches_skipped, 15);
    assert!(completion.is_analysis_complete());
    assert!(!completion.mark_analysis_complete());
    assert_eq!(*states.borrow_and_update(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_concurrent_acquire_second_waits_for_release() {
    let cells = Arc::new(CellReservation::new());
    let cancel = CancellationToken::new();
    let contested = Position::new(1, 1);

    cells.acquire(AgentId(1), contested, &cancel).await.unwrap();

    let second = {
        let cells = cells.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { cells.acquire(AgentId(2), contested, &cancel).await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!second.is_finished());
    assert_eq!(cells.holder(contested), Some(AgentId(1)));

    cells.release(AgentId(1));
    tokio::time::timeout(Duration::from_secs(5), second)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(cells.holder(contested), Some(AgentId(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reservations_are_mutually_exclusive_under_contention() {
    const AGENTS: u32 = 6;
    const ROUNDS: usize = 100;
    // Fewer cells than agents keeps every cell contested.
    let cells_available = [
        Position::new(0, 0),
        Position::new(0, 1),
        Position::new(1, 0),
        Position::new(1, 1),
    ];

    let cells = Arc::new(CellReservation::new());
    let occupied: Arc<Mutex<HashMap<Position, AgentId>>> = Arc::new(Mutex::new(HashMap::new()));
    let cancel = CancellationToken::new();

    let mut agents = Vec::new();
    for agent in 0..AGENTS {
        let cells = cells.clone();
        let occupied = occupied.clone();
        let cancel = cancel.clone();
        agents.push(tokio::spawn(async move {
            let me = AgentId(agent);
            let mut current: Option<Position> = None;
            for round in 0..ROUNDS {
                let target = cells_available[(agent as usize * 7 + round * 3) % cells_available.len()];
                if let Some(previous) = current.take() {
                    occupied.lock().remove(&previous);
                }
                cells.acquire(me, target, &cancel).await.unwrap();
                {
                    let mut occupied = occupied.lock();
                    if let Some(other) = occupied.insert(target, me) {
                        panic!("{target} held by {other} and {me} at once");
                    }
                }
                assert_eq!(cells.holder(target), Some(me));
                current = Some(target);
                tokio::task::yield_now().await;
            }
            if let Some(previous) = current {
                occupied.lock().remove(&previous);
            }
            cells.release(me);
        }));
    }

    tokio::time::timeout(Duration::from_secs(30), async {
        for agent in agents {
            agent.await.unwrap();
        }
    })
    .await
    .expect("no agent may stay blocked forever");
    assert!(cells.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_default_scenario_produces_forty_verdicts() {
    let manifest = MissionManifest::default();
    let mission = setup(&manifest);

    let plants = mission.field.plant_positions();
    assert_eq!(plants.len(), 10);
    let half = plants.len() / 2;
    let work = vec![plants[..half].to_vec(), plants[half..].to_vec()];

    run(&mission, work).await;

    let results = mission.log.snapshot();
    assert_eq!(results.len(), 10 * 4);
    assert!(mission.completion.is_collection_complete());
    assert!(mission.completion.is_analysis_complete());
    assert!(mission.center.reservations().is_empty());

    let at_one_one: Vec<&String> = results
        .iter()
        .filter(|r| r.ends_with("at position (1, 1)"))
        .collect();
    assert_eq!(
        at_one_one,
        vec![
            "Critical: Too wet at position (1, 1)",
            "Discrete soil temperature at position (1, 1)",
            "Discrete air humidity at position (1, 1)",
            "Optimal air temperature at position (1, 1)",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unplanted_visits_record_nothing() {
    let manifest = MissionManifest::default();
    let mission = setup(&manifest);

    let work = vec![
        vec![Position::new(4, 0), Position::new(0, 1), Position::new(3, 0)],
        vec![Position::new(4, 3), Position::new(3, 3)],
    ];
    run(&mission, work).await;

    let results = mission.log.snapshot();
    assert_eq!(results.len(), 2 * 4);
    for bare in ["(4, 0)", "(3, 0)", "(4, 3)"] {
        assert!(results.iter().all(|r| !r.contains(bare)), "{bare}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_out_of_bounds_target_is_skipped_without_reservation() {
    let manifest = MissionManifest::default();
    let mission = setup(&manifest);
    let rover = &mission.vehicles[0];

    let err = mission
        .center
        .send_movement_command(rover, Position::new(-1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SwarmError::OutOfBounds { .. }));
    assert_eq!(mission.center.reservations().holder(Position::new(-1, 0)), None);
    assert_eq!(rover.position(), Position::new(2, 2));
    assert_eq!(mission.center.reservations().query(rover.id()), Some(Position::new(2, 2)));

    let report = mission
        .center
        .run_work_list(rover, &[Position::new(-1, 0), Position::new(0, 1)])
        .await;
    assert_eq!(report.failures, 1);
    assert_eq!(report.reads, 1);
    assert_eq!(mission.completion.active_agents(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_stops_waiting_vehicles_and_worker() {
    let manifest = MissionManifest::default();
    let mission = setup(&manifest);
    let worker = AnalysisWorker::new(
        mission.channel.clone(),
        mission.field.clone(),
        Arc::new(ThresholdEvaluator::default()),
        mission.log.clone(),
    );
    let analysis = worker.start(mission.cancel.clone());

    // rover-2 sits on (3, 3); rover-1 has to wait for it.
    let blocked = {
        let center = mission.center.clone();
        let rover = mission.vehicles[0].clone();
        tokio::spawn(async move { center.run_work_list(&rover, &[Position::new(3, 3)]).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!blocked.is_finished());

    mission.cancel.cancel();

    let report = tokio::time::timeout(Duration::from_secs(5), blocked)
        .await
        .unwrap()
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(
        tokio::time::timeout(Duration::from_secs(5), analysis)
            .await
            .unwrap()
            .unwrap(),
        Err(SwarmError::Cancelled)
    );
    assert!(!mission.completion.is_analysis_complete());
}
