//! Async front end for producers that hand over candidates one at a time.
//!
//! A single blocking thread owns the [`Curator`]; handles send commands through
//! a bounded `mpsc` channel and wait for the answer on a `oneshot`. Decisions
//! are applied in the order the commands arrive. Curation is CPU bound (the
//! batch path fans out on rayon), so the loop stays off the async workers.
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    curation::{CurationError, CurationStats, Curator, DecisionRecord},
    diversity::DiversitySnapshot,
    model::Candidate,
};

pub const DEFAULT_CAPACITY: usize = 256;

enum Command {
    Process {
        candidate: Box<Candidate>,
        reply: oneshot::Sender<Result<DecisionRecord, CurationError>>,
    },
    Snapshot {
        reply: oneshot::Sender<DiversitySnapshot>,
    },
    Stats {
        reply: oneshot::Sender<CurationStats>,
    },
    Shutdown,
}

/// Cloneable handle to a running [`CurationService`].
#[derive(Debug, Clone)]
pub struct CurationHandle {
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Process { candidate, .. } => f
                .debug_struct("Process")
                .field("title", &candidate.title)
                .finish_non_exhaustive(),
            Self::Snapshot { .. } => f.write_str("Snapshot"),
            Self::Stats { .. } => f.write_str("Stats"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl CurationHandle {
    /// Curates one candidate.
    ///
    /// # Errors
    /// Returns [`CurationError::ServiceClosed`] when the service task is gone,
    /// or the curator's own error for the candidate.
    pub async fn submit(&self, candidate: Candidate) -> Result<DecisionRecord, CurationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Process {
            candidate: Box::new(candidate),
            reply,
        })
        .await?;
        rx.await.map_err(|_| CurationError::ServiceClosed)?
    }

    /// # Errors
    /// Returns [`CurationError::ServiceClosed`] when the service task is gone.
    pub async fn snapshot(&self) -> Result<DiversitySnapshot, CurationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| CurationError::ServiceClosed)
    }

    /// # Errors
    /// Returns [`CurationError::ServiceClosed`] when the service task is gone.
    pub async fn stats(&self) -> Result<CurationStats, CurationError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await.map_err(|_| CurationError::ServiceClosed)
    }

    /// Stops the service after the commands already queued. Other clones of
    /// the handle see [`CurationError::ServiceClosed`] from then on.
    ///
    /// # Errors
    /// Returns [`CurationError::ServiceClosed`] when the service task is gone.
    pub async fn shutdown(&self) -> Result<(), CurationError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), CurationError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CurationError::ServiceClosed)
    }
}

/// Single-writer loop around a [`Curator`].
pub struct CurationService {
    curator: Curator,
    commands: mpsc::Receiver<Command>,
}

impl CurationService {
    /// Spawns the service on the current runtime's blocking pool.
    ///
    /// The loop ends on [`CurationHandle::shutdown`] or once every handle is
    /// dropped, and hands the curator back through the join handle so the
    /// caller can persist its state.
    #[must_use]
    pub fn spawn(curator: Curator, capacity: usize) -> (CurationHandle, JoinHandle<Curator>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let service = Self {
            curator,
            commands: rx,
        };
        let task = tokio::task::spawn_blocking(move || service.run());
        (CurationHandle { commands: tx }, task)
    }

    fn run(mut self) -> Curator {
        info!("curation service started");
        while let Some(command) = self.commands.blocking_recv() {
            debug!(?command, "curation command");
            match command {
                Command::Process { candidate, reply } => {
                    let result = self.curator.process(*candidate);
                    if reply.send(result).is_err() {
                        warn!("caller went away before its decision was delivered");
                    }
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.curator.snapshot());
                }
                Command::Stats { reply } => {
                    let _ = reply.send(*self.curator.stats());
                }
                Command::Shutdown => break,
            }
        }
        info!(
            accepted = self.curator.collection().len(),
            "curation service stopped"
        );
        self.curator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curation::DecisionStatus,
        dedup::DetectorSettings,
        diversity::CollectionTargets,
        model::{Ingredient, Nutrition},
        vocabulary::Vocabulary,
    };

    fn curator() -> Curator {
        Curator::new(
            Vocabulary::builtin(),
            DetectorSettings::default(),
            CollectionTargets::default(),
        )
    }

    fn dinner(title: &str, url: &str, ingredients: &[&str]) -> Candidate {
        let mut candidate = Candidate::new(title);
        candidate.ingredients = ingredients
            .iter()
            .map(|name| Ingredient::new(*name, 1.0, "cup"))
            .collect();
        candidate.instructions = vec!["Simmer for 20 minutes.".to_string()];
        candidate.nutrition = Some(Nutrition {
            calories: 420.0,
            carbs: 40.0,
            fiber: 8.0,
            sugar: 6.0,
            protein: 22.0,
            fat: 12.0,
            saturated_fat: 2.0,
            sodium: 400.0,
        });
        candidate.tags.insert("dinner".to_string());
        candidate.source_url = url.to_string();
        candidate
    }

    #[tokio::test]
    async fn concurrent_submissions_commit_once() {
        let (handle, task) = CurationService::spawn(curator(), 8);
        let recipe = dinner("Lentil stew", "https://a.example/1", &["lentils", "carrots", "spinach"]);

        let submits = (0..4).map(|_| {
            let handle = handle.clone();
            let recipe = recipe.clone();
            tokio::spawn(async move { handle.submit(recipe).await })
        });
        let mut statuses = Vec::new();
        for submit in submits {
            statuses.push(submit.await.expect("join").expect("decision").status);
        }

        assert_eq!(
            statuses
                .iter()
                .filter(|status| **status == DecisionStatus::Accepted)
                .count(),
            1
        );
        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.received, 4);
        assert_eq!(stats.committed, 1);

        drop(handle);
        let curator = task.await.expect("service task");
        assert_eq!(curator.collection().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_reflects_committed_recipes() {
        let (handle, _task) = CurationService::spawn(curator(), 4);
        handle
            .submit(dinner("Tofu stir fry", "https://b.example/1", &["tofu", "broccoli", "brown rice"]))
            .await
            .expect("decision");

        let snapshot = handle.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.ledger.total_count, 1);
    }

    #[tokio::test]
    async fn shutdown_closes_every_handle_and_returns_curator() {
        let (handle, task) = CurationService::spawn(curator(), 4);
        let other = handle.clone();
        handle
            .submit(dinner("Bean chili", "https://c.example/1", &["black beans", "tomatoes", "onion"]))
            .await
            .expect("decision");

        handle.shutdown().await.expect("shutdown queued");
        let curator = task.await.expect("service task");
        assert_eq!(curator.collection().len(), 1);

        let error = other.stats().await.expect_err("service is gone");
        assert!(matches!(error, CurationError::ServiceClosed));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn decisions_arrive_while_runtime_thread_is_blocked() {
        let (handle, task) = CurationService::spawn(curator(), 4);
        let (reply, rx) = oneshot::channel();
        handle
            .commands
            .try_send(Command::Process {
                candidate: Box::new(dinner("Lentil stew", "https://d.example/1", &["lentils", "carrots", "spinach"])),
                reply,
            })
            .expect("queued");

        // The only runtime thread blocks here, so the decision has to come from
        // the service's own thread.
        let record = std::thread::spawn(move || rx.blocking_recv())
            .join()
            .expect("waiter thread")
            .expect("reply")
            .expect("decision");
        assert_eq!(record.status, DecisionStatus::Accepted);

        drop(handle);
        task.await.expect("service task");
    }
}
