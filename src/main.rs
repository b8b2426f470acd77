//! Hero Arena Server
//!
//! Demo driver for the match engine: plays one auto-drafted match and one
//! random-mode match bot-vs-bot to completion, logging the transcript.

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hero_arena::{
    Catalog, MatchMode, Phase, PlayerId, SessionRegistry, VERSION,
    game::events::BattleEvent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Hero Arena Server v{}", VERSION);
    let catalog = Catalog::builtin();
    info!("Catalog: {} enabled heroes", catalog.enabled_count());

    let registry = SessionRegistry::new(catalog);

    demo_match(&registry, MatchMode::Draft).await?;
    demo_match(&registry, MatchMode::Random).await?;

    Ok(())
}

/// Play one full match with two scripted bots.
async fn demo_match(registry: &SessionRegistry, mode: MatchMode) -> anyhow::Result<()> {
    info!("=== Starting Demo Match ({mode:?}) ===");

    let alice = PlayerId::new(*uuid::Uuid::new_v4().as_bytes());
    let bob = PlayerId::new(*uuid::Uuid::new_v4().as_bytes());

    registry.join_queue(alice, "alice", mode).await
        .map_err(|e| anyhow::anyhow!("alice failed to queue: {e}"))?;
    let outcome = registry.join_queue(bob, "bob", mode).await
        .map_err(|e| anyhow::anyhow!("bob failed to queue: {e}"))?;
    let session_id = outcome.session_id();
    info!("Session: {}", hex::encode(session_id));

    // Draft mode: take the auto-draft shortcut straight to initiative.
    // Random mode: declare attack orders as dealt.
    let snapshot = registry.get_snapshot(session_id).await
        .map_err(|e| anyhow::anyhow!("snapshot failed: {e}"))?;
    match snapshot.phase {
        Phase::Draft => {
            let response = registry.auto_draft(alice).await;
            anyhow::ensure!(response.success, "auto-draft failed: {:?}", response.error);
        }
        Phase::Setup => {
            for pid in [alice, bob] {
                let own = registry.get_player_snapshot(pid).await
                    .map_err(|e| anyhow::anyhow!("snapshot failed: {e}"))?;
                let slot = if pid == alice { 0 } else { 1 };
                let team = &own.slots[slot].team;
                let order = [team[0].name.clone(), team[1].name.clone(), team[2].name.clone()];
                let response = registry.set_attack_order(pid, &order).await;
                anyhow::ensure!(response.success, "attack order failed: {:?}", response.error);
            }
            registry.roll_initiative(alice).await;
            registry.roll_initiative(bob).await;
        }
        other => anyhow::bail!("unexpected phase after matchmaking: {other:?}"),
    }

    // Initiative winner always chooses to go first
    let snapshot = registry.get_snapshot(session_id).await
        .map_err(|e| anyhow::anyhow!("snapshot failed: {e}"))?;
    let r0 = snapshot.slots[0].initiative.unwrap_or(0);
    let r1 = snapshot.slots[1].initiative.unwrap_or(0);
    let winner = if r0 > r1 { alice } else { bob };
    info!("Initiative: alice {} vs bob {}", r0, r1);

    let response = registry.choose_turn_order(winner, true).await;
    anyhow::ensure!(response.success, "turn-order choice failed: {:?}", response.error);

    // Bot loop: attack the first targetable enemy, use the ability if the
    // attack is spent, end the turn.
    let mut turns = 0u32;
    loop {
        let snapshot = registry.get_snapshot(session_id).await
            .map_err(|e| anyhow::anyhow!("snapshot failed: {e}"))?;
        if snapshot.phase == Phase::Ended {
            let outcome = snapshot.outcome.context("ended without outcome")?;
            info!("=== Match Results ===");
            info!("Winner: {:?}", outcome.winner);
            for hero in &outcome.heroes {
                info!(
                    "  {} {} - acted: {}, died: {}",
                    hero.id, hero.name, hero.acted, hero.died
                );
            }
            info!("Finished after {turns} turns");
            return Ok(());
        }

        let Some(turn) = snapshot.current_turn else {
            anyhow::bail!("battle with no current turn");
        };
        let acting = if turn.player == 0 { alice } else { bob };
        let enemy = &snapshot.slots[1 - turn.player as usize];
        let target = enemy.team.iter()
            .find(|h| h.alive && !h.status.untargetable)
            .map(|h| h.id);

        if let Some(target) = target {
            registry.select_target(acting, target).await;
            let response = registry.basic_attack(acting).await;
            for event in &response.events {
                if let BattleEvent::AttackResolved { roll, total, armor_class, hit, crit, .. } = event {
                    info!(
                        "Turn {turns}: {turn} rolls {roll} (total {total}) vs AC {armor_class} -> {}{}",
                        if *hit { "HIT" } else { "MISS" },
                        if *crit { " (crit)" } else { "" },
                    );
                }
            }
        }

        let response = registry.end_turn(acting).await;
        anyhow::ensure!(response.success, "end turn failed: {:?}", response.error);
        for event in &response.events {
            match event {
                BattleEvent::HeroDied { hero } => info!("Hero {hero} died"),
                BattleEvent::PoisonTick { target, damage, .. } => {
                    info!("Poison ticks {damage} on {target}")
                }
                _ => {}
            }
        }

        turns += 1;
        anyhow::ensure!(turns < 1000, "demo match did not terminate");
    }
}
