//! Session controller.
//!
//! Orchestrates one generation attempt at a time: cache lookup, cost
//! estimate, streaming through the parser and phase machine, and the cache
//! write on success. Every processed frame republishes a [`SessionSnapshot`]
//! on a watch channel.
//!
//! Starting a session supersedes the previous one. The previous stream is
//! cancelled and anything it still produces is discarded, because snapshots
//! are only published for the current session id.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gitdiagram_keyring_store::{CredentialKey, CredentialStore};
use gitdiagram_protocol::{GenerateRequest, Subject};

use crate::cache::ResultCacheBridge;
use crate::config::GitDiagramConfig;
use crate::error::{DiagramError, Result};
use crate::machine::PhaseMachine;
use crate::parser::frames;
use crate::state::GenerationState;
use crate::transport::{CostEstimator, DiagramCache, GenerationTransport, LastGeneratedLookup};

/// What observers see of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Increases with every session; 0 before the first.
    pub session_id: u64,
    pub subject: Option<Subject>,
    pub state: GenerationState,
    /// Cost estimate reported before streaming, if one was requested.
    pub cost: Option<String>,
    pub last_generated: Option<DateTime<Utc>>,
    /// True until the session reaches a terminal state.
    pub loading: bool,
}

/// External services a controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn GenerationTransport>,
    pub estimator: Arc<dyn CostEstimator>,
    pub cache: Arc<dyn DiagramCache>,
    pub last_generated: Arc<dyn LastGeneratedLookup>,
    pub credentials: Arc<dyn CredentialStore>,
}

/// Credentials as read once at session start.
#[derive(Debug, Clone, Default)]
struct Credentials {
    api_key: Option<String>,
    github_pat: Option<String>,
    used_free_generation: bool,
}

impl Credentials {
    fn request(&self, subject: &Subject, instructions: &str) -> GenerateRequest {
        GenerateRequest::new(subject, instructions)
            .with_api_key(self.api_key.clone())
            .with_github_pat(self.github_pat.clone())
    }

    fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

struct Session {
    id: u64,
    cancel: CancellationToken,
}

pub struct SessionController {
    transport: Arc<dyn GenerationTransport>,
    estimator: Arc<dyn CostEstimator>,
    cache: ResultCacheBridge,
    last_generated: Arc<dyn LastGeneratedLookup>,
    credentials: Arc<dyn CredentialStore>,
    example_subjects: Vec<Subject>,
    max_instructions_len: usize,
    epoch: AtomicU64,
    active: Mutex<CancellationToken>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    pub fn new(collaborators: Collaborators, config: &GitDiagramConfig) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            transport: collaborators.transport,
            estimator: collaborators.estimator,
            cache: ResultCacheBridge::new(collaborators.cache),
            last_generated: collaborators.last_generated,
            credentials: collaborators.credentials,
            example_subjects: config.example_subjects(),
            max_instructions_len: config.max_instructions_len,
            epoch: AtomicU64::new(0),
            active: Mutex::new(CancellationToken::new()),
            snapshot,
        }
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Whether `subject` is a showcased example that cannot be changed.
    pub fn is_example(&self, subject: &Subject) -> bool {
        self.example_subjects.contains(subject)
    }

    /// Show the diagram for `subject`, generating it if it is not cached.
    pub async fn start(&self, subject: Subject) -> GenerationState {
        let session = self.begin(&subject);
        info!(subject = %subject, session_id = session.id, "Starting diagram session");

        if let Some(cached) = self.cache.lookup(&subject).await {
            let state = GenerationState::from_cached(&cached);
            let last_generated = self.fetch_last_generated(&subject).await;
            self.publish(session.id, |s| {
                s.state = state.clone();
                s.last_generated = last_generated;
                s.loading = false;
            });
            return state;
        }

        let credentials = self.read_credentials();
        self.estimate_and_generate(&session, &subject, "", "", credentials)
            .await
    }

    /// Generate a new diagram for `subject` following `instructions`.
    pub async fn modify(&self, subject: Subject, instructions: &str) -> Result<GenerationState> {
        self.check_editable(&subject, instructions)?;
        let session = self.begin(&subject);
        info!(subject = %subject, session_id = session.id, "Modifying diagram");
        let credentials = self.read_credentials();
        Ok(self
            .estimate_and_generate(&session, &subject, instructions, instructions, credentials)
            .await)
    }

    /// Generate `subject` from scratch, ignoring any cached diagram.
    pub async fn regenerate(&self, subject: Subject, instructions: &str) -> Result<GenerationState> {
        self.check_editable(&subject, instructions)?;
        let session = self.begin(&subject);
        info!(subject = %subject, session_id = session.id, "Regenerating diagram");
        let credentials = self.read_credentials();
        // A regeneration is priced as a plain generation.
        Ok(self
            .estimate_and_generate(&session, &subject, "", instructions, credentials)
            .await)
    }

    /// Save the user's API key, then generate again with it.
    pub async fn submit_api_key(&self, subject: Subject, api_key: &str) -> Result<GenerationState> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(DiagramError::EmptyApiKey);
        }
        self.credentials.set(CredentialKey::ApiKey, api_key)?;
        info!(subject = %subject, "Stored API key, generating");
        Ok(self.run_generation(subject, "").await)
    }

    /// Stream a fresh generation without consulting the cache or the
    /// estimator.
    pub async fn run_generation(&self, subject: Subject, instructions: &str) -> GenerationState {
        let session = self.begin(&subject);
        let credentials = self.read_credentials();
        self.generate(&session, &subject, instructions, &credentials)
            .await
    }

    /// Abort the active stream, if any.
    pub fn cancel(&self) {
        debug!("Cancelling active session");
        self.active.lock().cancel();
    }

    fn check_editable(&self, subject: &Subject, instructions: &str) -> Result<()> {
        if self.is_example(subject) {
            return Err(DiagramError::ReadOnlySubject {
                subject: subject.to_string(),
            });
        }
        let len = instructions.chars().count();
        if len > self.max_instructions_len {
            return Err(DiagramError::InstructionsTooLong {
                len,
                max: self.max_instructions_len,
            });
        }
        Ok(())
    }

    /// Supersede the current session and publish a loading snapshot.
    fn begin(&self, subject: &Subject) -> Session {
        let id = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock();
            active.cancel();
            *active = cancel.clone();
        }
        self.snapshot.send_replace(SessionSnapshot {
            session_id: id,
            subject: Some(subject.clone()),
            loading: true,
            ..SessionSnapshot::default()
        });
        Session { id, cancel }
    }

    fn is_current(&self, id: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == id
    }

    /// Apply `update` to the snapshot if `id` is still the current session.
    fn publish(&self, id: u64, update: impl FnOnce(&mut SessionSnapshot)) -> bool {
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.session_id != id {
                return false;
            }
            update(snapshot);
            true
        })
    }

    fn publish_state(&self, id: u64, state: &GenerationState) -> bool {
        self.publish(id, |s| {
            s.loading = !state.is_terminal();
            s.state = state.clone();
        })
    }

    fn read_credentials(&self) -> Credentials {
        let read = |key: CredentialKey| match self.credentials.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Failed to read credential");
                None
            }
        };
        let used_free_generation = self
            .credentials
            .flag(CredentialKey::UsedFreeGeneration)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read free generation flag");
                false
            });

        Credentials {
            api_key: read(CredentialKey::ApiKey),
            github_pat: read(CredentialKey::GithubPat),
            used_free_generation,
        }
    }

    async fn fetch_last_generated(&self, subject: &Subject) -> Option<DateTime<Utc>> {
        match self.last_generated.last_generated(subject).await {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!(subject = %subject, error = %e, "Failed to fetch last generated date");
                None
            }
        }
    }

    async fn estimate_and_generate(
        &self,
        session: &Session,
        subject: &Subject,
        estimate_instructions: &str,
        instructions: &str,
        credentials: Credentials,
    ) -> GenerationState {
        // The estimate never needs the model key.
        let request = credentials
            .request(subject, estimate_instructions)
            .with_api_key(None);

        let estimate = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => Err(DiagramError::Cancelled),
            estimate = self.estimator.estimate(&request) => estimate,
        };

        let failure = match estimate {
            Ok(estimate) => match estimate.error() {
                Some(message) => Some(DiagramError::Estimate(message.to_string())),
                None => {
                    let cost = estimate.cost.clone();
                    debug!(subject = %subject, cost = ?cost, "Cost estimate received");
                    self.publish(session.id, |s| s.cost = cost);
                    None
                }
            },
            Err(e) => Some(e),
        };

        if let Some(e) = failure {
            error!(subject = %subject, error = %e, "Cost estimation failed");
            let state = GenerationState::failed(e.to_string());
            self.publish_state(session.id, &state);
            return state;
        }

        self.generate(session, subject, instructions, &credentials)
            .await
    }

    async fn generate(
        &self,
        session: &Session,
        subject: &Subject,
        instructions: &str,
        credentials: &Credentials,
    ) -> GenerationState {
        let mut machine = PhaseMachine::new();
        self.publish_state(session.id, machine.state());

        let request = credentials.request(subject, instructions);
        let opened = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => Err(DiagramError::Cancelled),
            opened = self.transport.open(&request) => opened,
        };

        match opened {
            Ok(bytes) => {
                let mut stream = std::pin::pin!(frames(bytes));
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = session.cancel.cancelled() => Some(Err(DiagramError::Cancelled)),
                        next = stream.next() => next,
                    };

                    match next {
                        Some(Ok(frame)) => {
                            if !self.is_current(session.id) {
                                debug!(session_id = session.id, "Session superseded, dropping stream");
                                return machine.into_state();
                            }
                            let transition = machine.apply(frame);
                            if transition.changed() {
                                self.publish_state(session.id, machine.state());
                            }
                            if transition.is_terminal() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            if matches!(e, DiagramError::Cancelled) {
                                info!(subject = %subject, "Generation cancelled");
                            } else {
                                error!(subject = %subject, error = %e, "Generation stream failed");
                            }
                            machine.fail(e.to_string());
                            break;
                        }
                        None => {
                            if !machine.is_terminal() {
                                warn!(subject = %subject, "Stream closed before a terminal frame");
                                machine.fail(DiagramError::StreamClosed.to_string());
                            }
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                error!(subject = %subject, error = %e, "Failed to open generation stream");
                machine.fail(e.to_string());
            }
        }

        self.settle(session, subject, machine.into_state(), credentials)
            .await
    }

    /// Publish the terminal state; on success, write the cache and the
    /// free-generation flag first.
    async fn settle(
        &self,
        session: &Session,
        subject: &Subject,
        state: GenerationState,
        credentials: &Credentials,
    ) -> GenerationState {
        if !self.is_current(session.id) {
            debug!(session_id = session.id, "Session superseded, discarding result");
            return state;
        }

        if state.is_complete() {
            self.cache
                .store_completed(subject, &state, credentials.has_api_key())
                .await;
            if !credentials.used_free_generation {
                self.mark_free_generation_used();
            }
            let last_generated = self.fetch_last_generated(subject).await;
            self.publish(session.id, |s| s.last_generated = last_generated);
            info!(subject = %subject, "Diagram generated");
        }

        self.publish_state(session.id, &state);
        state
    }

    fn mark_free_generation_used(&self) {
        match self.credentials.flag(CredentialKey::UsedFreeGeneration) {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self
                    .credentials
                    .set_flag(CredentialKey::UsedFreeGeneration, true)
                {
                    warn!(error = %e, "Failed to record free generation");
                }
            }
            Err(e) => warn!(error = %e, "Failed to read free generation flag"),
        }
    }
}
