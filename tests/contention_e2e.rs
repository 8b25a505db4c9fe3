//! Contention: blocking, release races, denial and watch notification
//!
//! These tests run flips from independent tasks on a multi-thread runtime
//! and synchronize on observable board state (`is_waiting`) rather than
//! timing assumptions.

use flipgrid::board::Board;
use flipgrid::core::Location;
use flipgrid::loader::LayoutLoader;
use flipgrid::{FlipError, Result};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// 2x2 board: pairs A and B.
fn board_2x2() -> Board {
    let setup = LayoutLoader::parse("2 2\nA B\nB A\n").unwrap();
    Board::new(setup).unwrap()
}

fn loc(token: &str) -> Location {
    token.parse().unwrap()
}

async fn wait_until_parked(board: &Board, actor: &str, l: Location) {
    for _ in 0..200 {
        if board.is_waiting(actor, l).await.unwrap() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("{actor} never parked on {l}");
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_d_blocked_flip_resolves_on_release() -> Result<()> {
    let board = board_2x2();
    let l00 = loc("0x0");

    board.flip("p1", l00).await?;

    let handle = board.clone_handle();
    let blocked = tokio::spawn(async move { handle.flip("p2", l00).await });
    wait_until_parked(&board, "p2", l00).await;

    // p1's non-matching second flip relinquishes 0x0 and wakes p2.
    board.flip("p1", loc("0x1")).await?;

    timeout(Duration::from_secs(2), blocked).await.unwrap()??;
    let view = board.look("p2").await?;
    assert!(view.lines().nth(1).unwrap().starts_with("my "));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn released_waiters_race_exactly_one_wins() -> Result<()> {
    let board = board_2x2();
    let l00 = loc("0x0");

    board.flip("p1", l00).await?;

    let mut blocked = Vec::new();
    for actor in ["p2", "p3"] {
        let handle = board.clone_handle();
        blocked.push(tokio::spawn(async move {
            // The loser re-parks after losing the race, so cap the wait.
            timeout(Duration::from_millis(300), handle.flip(actor, l00)).await
        }));
        wait_until_parked(&board, actor, l00).await;
    }

    board.flip("p1", loc("0x1")).await?; // release

    let mut wins = 0;
    for task in blocked {
        if let Ok(Ok(())) = task.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1, "exactly one released waiter may acquire control");

    let p2_view = board.look("p2").await?;
    let p3_view = board.look("p3").await?;
    let p2_won = p2_view.lines().nth(1).unwrap().starts_with("my ");
    let p3_won = p3_view.lines().nth(1).unwrap().starts_with("my ");
    assert!(p2_won != p3_won);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn waiter_on_matched_pair_is_denied() -> Result<()> {
    let board = board_2x2();
    let l00 = loc("0x0");

    board.flip("p1", l00).await?; // A

    let handle = board.clone_handle();
    let blocked = tokio::spawn(async move { handle.flip("p2", l00).await });
    wait_until_parked(&board, "p2", l00).await;

    // p1 completes the A pair; 0x0 stays controlled, p2 stays parked.
    board.flip("p1", loc("1x1")).await?;
    assert!(board.is_waiting("p2", l00).await?);

    // p1's next turn sweeps the pair away; p2's wait is denied.
    board.flip("p1", loc("0x1")).await?;
    let err = timeout(Duration::from_secs(2), blocked)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, FlipError::LocationUnavailable(_)));

    let view = board.look("p2").await?;
    assert_eq!(view.lines().nth(1).unwrap(), "none");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_concurrent_wait_is_rejected() -> Result<()> {
    let board = board_2x2();
    let l00 = loc("0x0");

    board.flip("p1", l00).await?;

    let handle = board.clone_handle();
    let _blocked = tokio::spawn(async move {
        let _ = timeout(Duration::from_millis(300), handle.flip("p2", l00)).await;
    });
    wait_until_parked(&board, "p2", l00).await;

    // A second in-flight flip by the same actor on the same location.
    let err = board.flip("p2", l00).await.unwrap_err();
    assert!(matches!(err, FlipError::AlreadyWaiting(_)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_fires_once_per_registration() -> Result<()> {
    let board = board_2x2();

    let handle = board.clone_handle();
    let watcher = tokio::spawn(async move { handle.watch("p2").await });
    // Give the watcher a moment to register before mutating.
    sleep(Duration::from_millis(50)).await;

    board.flip("p1", loc("0x0")).await?;

    let view = timeout(Duration::from_secs(2), watcher).await.unwrap()??;
    assert!(view.lines().nth(1).unwrap().starts_with("up "));

    // Consumed: a new registration does not see the old event.
    let handle = board.clone_handle();
    let watcher = tokio::spawn(async move {
        timeout(Duration::from_millis(200), handle.watch("p2")).await
    });
    assert!(watcher.await.unwrap().is_err(), "watcher must wait for a fresh change");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn multiple_watchers_notified_by_same_event() -> Result<()> {
    let board = board_2x2();

    let mut watchers = Vec::new();
    for actor in ["p2", "p3", "p4"] {
        let handle = board.clone_handle();
        watchers.push(tokio::spawn(async move { handle.watch(actor).await }));
    }
    sleep(Duration::from_millis(50)).await;

    board.flip("p1", loc("1x0")).await?;

    for watcher in watchers {
        let view = timeout(Duration::from_secs(2), watcher).await.unwrap()??;
        // 1x0 is row-major cell index 2, line 3 of the rendering.
        assert!(view.lines().nth(3).unwrap().starts_with("up "));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_fires_even_when_the_triggering_flip_fails() -> Result<()> {
    let board = board_2x2();

    // Empty a location first.
    board.flip("p1", loc("0x0")).await?;
    board.flip("p1", loc("1x1")).await?; // match
    board.flip("p1", loc("0x1")).await?; // sweep; p1 holds 0x1

    let handle = board.clone_handle();
    let watcher = tokio::spawn(async move { handle.watch("p2").await });
    sleep(Duration::from_millis(50)).await;

    // A failed flip still completes a call; observers hear about it.
    let err = board.flip("p3", loc("0x0")).await.unwrap_err();
    assert!(matches!(err, FlipError::EmptyLocation(_)));

    let view = timeout(Duration::from_secs(2), watcher).await.unwrap()??;
    assert_eq!(view.lines().nth(1).unwrap(), "none");
    Ok(())
}
