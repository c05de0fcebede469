//! Deploy pipeline
//!
//! Runs one request through resolve → pre-build → build → publish → launch.
//! The first failing stage ends the request; later stages never run.

use crate::error::DeployError;
use repoflow_build::{BuildTool, PreBuildStep, RegistryPublisher};
use repoflow_cloud::TaskLauncher;
use repoflow_core::{DeployOutcome, DeployRequest, Language, RepoName, resolve_repo_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = HashMap<RepoName, Arc<Mutex<()>>>;

/// Per-repo mutual exclusion
///
/// Build and publish share the local `<repo>:latest` tag, so requests for
/// the same repo take turns. Different repos run in parallel. An entry lives
/// only while some request holds or waits for it.
#[derive(Default)]
pub struct RepoLocks {
    locks: Arc<StdMutex<LockMap>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `repo`
    pub async fn acquire(&self, repo: &RepoName) -> RepoLockGuard {
        let lock = {
            let mut locks = lock_map(&self.locks);
            // entries left behind by cancelled waiters
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(repo.clone()).or_default().clone()
        };

        RepoLockGuard {
            repo: repo.clone(),
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    /// Number of repos currently locked or waited on
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to one repo. Dropping it releases the lock and removes
/// the repo's entry when nobody else is waiting.
pub struct RepoLockGuard {
    repo: RepoName,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl Drop for RepoLockGuard {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        // release under the map lock so no acquire can clone the entry in between
        self.guard.take();
        if locks
            .get(&self.repo)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.repo);
        }
    }
}

pub struct DeployPipeline {
    pre_build: Option<Arc<dyn PreBuildStep>>,
    builder: Arc<dyn BuildTool>,
    publisher: RegistryPublisher,
    launcher: TaskLauncher,
    locks: RepoLocks,
}

impl DeployPipeline {
    pub fn new(
        builder: Arc<dyn BuildTool>,
        publisher: RegistryPublisher,
        launcher: TaskLauncher,
    ) -> Self {
        Self {
            pre_build: None,
            builder,
            publisher,
            launcher,
            locks: RepoLocks::new(),
        }
    }

    /// Run `step` before every build. Its failures are logged, not returned.
    pub fn with_pre_build(mut self, step: Arc<dyn PreBuildStep>) -> Self {
        self.pre_build = Some(step);
        self
    }

    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, DeployError> {
        let language: Language = request.language.parse()?;
        let repo = resolve_repo_name(&request.giturl)?;
        tracing::info!("Deploying {} ({}) from {}", repo, language, request.giturl);

        let image = {
            let _guard = self.locks.acquire(&repo).await;

            if let Some(step) = &self.pre_build
                && let Err(e) = step.run(&request.giturl).await
            {
                tracing::warn!("{}", e.user_message());
            }

            self.builder
                .build(&repo, &request.giturl, language)
                .await?;

            self.publisher.publish(&repo).await?
        };
        tracing::info!("Published {}", image);

        let task = self.launcher.launch(&repo).await?;

        Ok(DeployOutcome {
            repo_name: repo.to_string(),
            image,
            task_id: task.task_id,
            endpoint: task.endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_repo_locks_serialize_same_repo() {
        let locks = Arc::new(RepoLocks::new());
        let repo = RepoName::new("widgets").unwrap();

        let guard = locks.acquire(&repo).await;

        let waiter = {
            let locks = locks.clone();
            let repo = repo.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&repo).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_repo_locks_pruned_after_release() {
        let locks = RepoLocks::new();

        for i in 0..1000 {
            let repo = RepoName::new(format!("repo-{}", i)).unwrap();
            let _guard = locks.acquire(&repo).await;
            assert_eq!(locks.len(), 1);
        }

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_repo_locks_entry_kept_while_waiting() {
        let locks = Arc::new(RepoLocks::new());
        let repo = RepoName::new("widgets").unwrap();

        let guard = locks.acquire(&repo).await;
        let waiter = {
            let locks = locks.clone();
            let repo = repo.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&repo).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(guard);
        // the waiter still needs the entry
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_repo_locks_cancelled_waiter_is_pruned() {
        let locks = RepoLocks::new();
        let widgets = RepoName::new("widgets").unwrap();
        let gadgets = RepoName::new("gadgets").unwrap();

        let guard = locks.acquire(&widgets).await;
        let mut waiting = Box::pin(locks.acquire(&widgets));
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut waiting)
                .await
                .is_err()
        );

        drop(guard);
        drop(waiting);
        assert_eq!(locks.len(), 1);

        drop(locks.acquire(&gadgets).await);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_repo_locks_independent_repos() {
        let locks = RepoLocks::new();
        let widgets = RepoName::new("widgets").unwrap();
        let gadgets = RepoName::new("gadgets").unwrap();

        let _widgets = locks.acquire(&widgets).await;
        let acquired =
            tokio::time::timeout(Duration::from_secs(1), locks.acquire(&gadgets)).await;
        assert!(acquired.is_ok());
    }
}
