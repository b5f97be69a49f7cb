//! Autonomous simulated actors.
//!
//! Each actor registers an account and then keeps making random choices
//! (post, follow, unfollow) against the kernel, like a very bored user.
//! Useful as a load generator and for watching fan-out in a browser.

use crate::error::KernelError;
use crate::kernel::KernelHandle;
use crate::telemetry::spans;
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

const ACTOR_PASSWORD: &str = "Password? We don't need no stinkin' password!";

/// Longest pause between two actions.
const MAX_PAUSE_MS: u64 = 1000;

/// Spawn `count` actors named `user0`, `user1`, ...
pub fn spawn_actors(kernel: KernelHandle, count: usize) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|i| {
            let name = actor_name(i);
            let span = spans::actor(&name);
            let kernel = kernel.clone();
            tokio::spawn(
                async move {
                    if let Err(e) = run_actor(kernel, name, count).await {
                        warn!(error = %e, "Actor stopped");
                    }
                }
                .instrument(span),
            )
        })
        .collect()
}

fn actor_name(i: usize) -> String {
    format!("user{i}")
}

async fn run_actor(kernel: KernelHandle, name: String, population: usize) -> Result<(), KernelError> {
    kernel.register(&name, ACTOR_PASSWORD).await?;
    kernel.post(&name, &format!("#user @{name} registered")).await?;
    info!("Registered");

    loop {
        // ThreadRng is not Send; keep it out of scope across awaits.
        let (choice, number, other, pause) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(0..3u8),
                rng.r#gen::<u32>(),
                actor_name(rng.gen_range(0..population)),
                rng.gen_range(0..MAX_PAUSE_MS),
            )
        };

        match choice {
            0 => {
                let text = format!("I picked a random number: {number}!");
                let id = kernel.post(&name, &text).await?;
                debug!(%id, "Posted");
            }
            1 => match kernel.follow(&other, &name).await {
                Ok(()) => debug!(followee = %other, "Started following"),
                Err(KernelError::Unavailable) => return Err(KernelError::Unavailable),
                Err(e) => debug!(followee = %other, error = %e, "Follow refused"),
            },
            _ => match kernel.unfollow(&other, &name).await {
                Ok(()) => debug!(followee = %other, "Stopped following"),
                Err(KernelError::Unavailable) => return Err(KernelError::Unavailable),
                Err(e) => debug!(followee = %other, error = %e, "Unfollow refused"),
            },
        }

        tokio::time::sleep(Duration::from_millis(pause)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::kernel::Kernel;

    #[tokio::test(start_paused = true)]
    async fn actors_register_and_announce_themselves() {
        let (kernel, join) = Kernel::spawn(&KernelConfig::default());
        let actors = spawn_actors(kernel.clone(), 3);

        tokio::time::sleep(Duration::from_millis(50)).await;

        for name in ["user0", "user1", "user2"] {
            assert!(kernel.user(name).await.unwrap().is_some(), "{name} missing");
        }
        let announced = kernel.tagged("user").await.unwrap();
        assert!(announced.len() >= 3);

        kernel.shutdown();
        join.await.unwrap();
        for actor in actors {
            tokio::time::timeout(Duration::from_secs(5), actor)
                .await
                .expect("actor should stop once the kernel is gone")
                .unwrap();
        }
    }
}
