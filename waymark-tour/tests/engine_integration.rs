//! End-to-end engine tests: real timers, stubbed loader and pose sources
//!
//! Timings are driven by test-scale configuration tables (tens of
//! milliseconds) with generous margins on every assertion, so the suite
//! stays fast without becoming racy.

mod helpers;

use helpers::{
    assert_no_event, init_tracing, slot, sources_for, target, tour, wait_for_event, ScriptedPose,
    StubLoader,
};
use glam::{Quat, Vec3};
use std::sync::Arc;
use std::time::Duration;
use waymark_common::config::{PartConfig, SlotConfig};
use waymark_common::events::TourEvent;
use waymark_common::Transform;
use waymark_tour::tour::{PoseSource, Tour};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[tokio::test]
async fn scenario_timed_composite_reveal() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![target("north", vec![slot(&[(0, 0), (200, 0)])])]);
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources_for_one())?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::PartRevealed { part_index: 0, .. })
    })
    .await?;

    // Mid-timeline: the second part is still hidden, the slot incomplete
    tokio::time::sleep(ms(80)).await;
    let scene = tour.state().get_scene().await;
    assert!(scene.iter().any(|v| v.part_index == 0 && v.visible));
    assert!(scene.iter().any(|v| v.part_index == 1 && !v.visible));
    assert!(!tour.state().get_nav().await.info_enabled);

    wait_for_event(&mut rx, ms(1000), |e| {
        matches!(e, TourEvent::SlotCompleted { slot_index: 0, .. })
    })
    .await?;
    tokio::time::sleep(ms(20)).await;
    let scene = tour.state().get_scene().await;
    assert!(scene.iter().all(|v| v.visible), "both permanent parts up");
    assert!(tour.state().get_nav().await.info_enabled);

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn scenario_exclusive_slot_shows_exactly_one_part() -> anyhow::Result<()> {
    init_tracing();
    let mut exclusive_slot = slot(&[(0, 0), (100, 0), (200, 0)]);
    exclusive_slot.exclusive = true;
    let config = tour(vec![target("north", vec![exclusive_slot])]);
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources_for_one())?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    for expected in 0..3usize {
        wait_for_event(&mut rx, ms(500), |e| {
            matches!(e, TourEvent::PartRevealed { part_index, .. } if *part_index == expected)
        })
        .await?;
        // Let the snapshot catch up with the emission
        tokio::time::sleep(ms(20)).await;
        let visible: Vec<usize> = tour
            .state()
            .get_scene()
            .await
            .iter()
            .filter(|v| v.visible)
            .map(|v| v.part_index)
            .collect();
        assert_eq!(visible, vec![expected], "exactly one part visible");
    }

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn scenario_grace_handoff_initializes_next_target_once() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![
        target("north", vec![slot(&[(0, 0)])]),
        target(
            "south",
            vec![SlotConfig {
                exclusive: false,
                reset_on_enter: true,
                reset_on_leave: true,
                parts: vec![PartConfig {
                    source: "south-0.glb".to_string(),
                    reveal_at_ms: 0,
                    hide_after_ms: 0,
                }],
            }],
        ),
    ]);
    let loader = Arc::new(StubLoader::instant());
    let sources = sources_for(&config);
    let tour = Tour::launch(config, loader.clone(), sources)?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(1000), |e| {
        matches!(e, TourEvent::TargetTourCompleted { target_index: 0, .. })
    })
    .await?;

    // During the grace window the finished target stays up and the
    // successor is not yet initialized
    assert_eq!(tour.state().get_active_target().await, Some(0));
    assert!(!loader.calls().contains(&"south-0.glb".to_string()));
    assert_no_event(&mut rx, ms(60), |e| {
        matches!(e, TourEvent::TargetDeactivated { .. })
    })
    .await;

    // Grace expiry: deactivation, prompt, arrow, lazy initialization
    wait_for_event(&mut rx, ms(600), |e| {
        matches!(e, TourEvent::SeekTargetPrompt { target_index: 1, .. })
    })
    .await?;
    tokio::time::sleep(ms(20)).await;
    assert_eq!(tour.state().get_active_target().await, None);
    let south_loads = loader
        .calls()
        .iter()
        .filter(|s| s.as_str() == "south-0.glb")
        .count();
    assert_eq!(south_loads, 1, "successor assets load exactly once");

    // Finding the next target completes the tour
    tour.target_found(1)?;
    wait_for_event(&mut rx, ms(1000), |e| matches!(e, TourEvent::TourCompleted { .. })).await?;

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn scenario_failed_asset_does_not_block_timeline() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![target(
        "north",
        vec![slot(&[(0, 0), (40, 0), (80, 0), (120, 0), (160, 0)])],
    )]);
    let loader = Arc::new(StubLoader::instant().failing("part-2.glb"));
    let tour = Tour::launch(config, loader, sources_for_one())?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(500), |e| matches!(e, TourEvent::AssetLoadFailed { .. })).await?;
    wait_for_event(&mut rx, ms(1000), |e| {
        matches!(e, TourEvent::SlotCompleted { slot_index: 0, .. })
    })
    .await?;

    let scene = tour.state().get_scene().await;
    for view in &scene {
        if view.part_index == 2 {
            assert!(!view.visible, "failed part never appears");
        } else {
            assert!(view.visible, "part {} unaffected by the failure", view.part_index);
        }
    }

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn scenario_replay_after_prompt_reactivates_and_restarts() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![
        target("north", vec![slot(&[(0, 0)])]),
        target("south", vec![slot(&[(0, 0)])]),
    ]);
    let sources = sources_for(&config);
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources)?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(1000), |e| {
        matches!(e, TourEvent::SeekTargetPrompt { target_index: 1, .. })
    })
    .await?;
    tokio::time::sleep(ms(20)).await;
    assert_eq!(tour.state().get_active_target().await, None);

    // Replay during the handoff window: prompt hidden, target 0 back up,
    // timeline restarted from t=0
    tour.replay()?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::SeekTargetPromptDismissed { .. })
    })
    .await?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::TargetActivated { target_index: 0, .. })
    })
    .await?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::PartRevealed { part_index: 0, .. })
    })
    .await?;
    assert_eq!(tour.state().get_active_target().await, Some(0));

    // The tour completes again and hands off again
    wait_for_event(&mut rx, ms(1000), |e| {
        matches!(e, TourEvent::SeekTargetPrompt { target_index: 1, .. })
    })
    .await?;

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn late_assets_start_sequence_on_resolution() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![target("north", vec![slot(&[(0, 0)])])]);
    let tour = Tour::launch(
        config,
        Arc::new(StubLoader::with_delay(ms(120))),
        sources_for_one(),
    )?;
    let mut rx = tour.subscribe();

    // Target found before its assets have resolved
    tour.target_found(0)?;
    assert_no_event(&mut rx, ms(50), |e| matches!(e, TourEvent::PartRevealed { .. })).await;

    // Content appears once the load lands, without user interaction
    wait_for_event(&mut rx, ms(1000), |e| matches!(e, TourEvent::PartRevealed { .. })).await?;

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn premature_target_sighting_raises_notice() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![
        target("north", vec![slot(&[(0, 0)])]),
        target("south", vec![slot(&[(0, 0)])]),
    ]);
    let sources = sources_for(&config);
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources)?;
    let mut rx = tour.subscribe();

    tour.target_found(1)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::TargetNotReady { target_index: 1, .. })
    })
    .await?;
    assert_eq!(tour.state().get_active_target().await, None);

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn lost_target_reshows_seek_prompt() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![target(
        "north",
        vec![slot(&[(0, 0)]), slot(&[(0, 0)])],
    )]);
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources_for_one())?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::SlotCompleted { slot_index: 0, .. })
    })
    .await?;

    tour.target_lost(0)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::TargetDeactivated { target_index: 0, .. })
    })
    .await?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::SeekTargetPrompt { target_index: 0, .. })
    })
    .await?;

    // Re-acquiring the marker re-engages the same target
    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::TargetActivated { target_index: 0, .. })
    })
    .await?;

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn navigation_gate_and_label_follow_the_tour() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![
        target("north", vec![slot(&[(0, 0)]), slot(&[(0, 0)])]),
        target("south", vec![slot(&[(0, 0)])]),
    ]);
    let sources = sources_for(&config);
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources)?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::SlotCompleted { slot_index: 0, .. })
    })
    .await?;
    tokio::time::sleep(ms(20)).await;

    let nav = tour.state().get_nav().await;
    assert!(!nav.prev_enabled, "first slot");
    assert!(nav.next_enabled, "slot finished revealing");
    assert_eq!(tour.state().get_current_label().await, "1/2");

    tour.go_next()?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::SlotCompleted { slot_index: 1, .. })
    })
    .await?;
    tokio::time::sleep(ms(20)).await;

    let nav = tour.state().get_nav().await;
    assert!(nav.prev_enabled);
    assert!(
        nav.next_enabled,
        "completed last slot advances to the next target"
    );
    assert_eq!(tour.state().get_current_label().await, "2/2");

    tour.shutdown();
    Ok(())
}

#[tokio::test]
async fn tick_seeds_then_smooths_and_clamps_delta() -> anyhow::Result<()> {
    init_tracing();
    let config = tour(vec![target("north", vec![slot(&[(0, 0)])])]);
    let pose = ScriptedPose::at_origin();
    let sources: Vec<Arc<dyn PoseSource>> = vec![pose.clone()];
    let tour = Tour::launch(config, Arc::new(StubLoader::instant()), sources)?;
    let mut rx = tour.subscribe();

    tour.target_found(0)?;
    wait_for_event(&mut rx, ms(500), |e| {
        matches!(e, TourEvent::TargetActivated { target_index: 0, .. })
    })
    .await?;

    // First sample after Found is assigned, not blended
    pose.set(Transform::new(
        Vec3::new(10.0, 0.0, 0.0),
        Quat::IDENTITY,
        Vec3::ONE,
    ));
    let tick = tour.tick().await?;
    assert_eq!(tick.engaged_target, Some(0));
    let seeded = tick.transform.unwrap();
    assert!((seeded.position.x - 10.0).abs() < 1e-5, "no initial snap");

    // Subsequent samples blend with the constant factor (alpha = 0.08)
    pose.set(Transform::new(
        Vec3::new(20.0, 0.0, 0.0),
        Quat::IDENTITY,
        Vec3::ONE,
    ));
    let tick = tour.tick().await?;
    let blended = tick.transform.unwrap();
    assert!(
        (blended.position.x - 10.8).abs() < 0.2,
        "expected one smoothing step toward the raw pose, got {}",
        blended.position.x
    );

    // A stalled frame is clamped before reaching animation consumers
    tokio::time::sleep(ms(250)).await;
    let tick = tour.tick().await?;
    assert!(tick.delta <= ms(100), "delta clamped, got {:?}", tick.delta);

    tour.shutdown();
    Ok(())
}

fn sources_for_one() -> Vec<Arc<dyn PoseSource>> {
    vec![ScriptedPose::at_origin() as Arc<dyn PoseSource>]
}
