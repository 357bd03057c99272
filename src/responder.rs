//! Poll loop: fetch unreplied candidates, reply, then relabel
//!
//! Each tick re-derives its candidate set from the mailbox; nothing is cached
//! between ticks. Messages inside a tick are handled one after another and a
//! tick always completes before the next delay is rolled, so ticks never
//! overlap. The dedup label is only applied after a reply was sent, so a
//! failed send leaves the message as a candidate for the next tick.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::client::MailboxClient;
use crate::composer::ReplyComposer;
use crate::config::ResponderConfig;
use crate::error::{GmailError, Result};
use crate::label_resolver::{LabelResolver, ResolvedLabel};
use crate::scheduler::{PollScheduler, Timer};

/// Read-only state shared by every tick
#[derive(Debug, Clone)]
pub struct ResponderContext {
    dedup_label: ResolvedLabel,
    source_label: String,
}

impl ResponderContext {
    pub fn new(dedup_label: ResolvedLabel, source_label: impl Into<String>) -> Self {
        Self {
            dedup_label,
            source_label: source_label.into(),
        }
    }

    pub fn dedup_label(&self) -> &ResolvedLabel {
        &self.dedup_label
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }
}

/// Terminal state of one candidate within a tick
#[derive(Debug)]
pub enum MessageOutcome {
    /// Reply sent and message moved under the dedup label
    Replied {
        message_id: String,
        to: String,
        sent_id: String,
    },
    /// Message already belongs to a reply chain
    Skipped { message_id: String },
    /// Message could not be fetched, e.g. deleted since listing
    FetchFailed { message_id: String, error: GmailError },
    /// No reply could be built from the message's headers
    ComposeFailed { message_id: String, error: GmailError },
    /// Reply was not sent; the message stays a candidate
    SendFailed { message_id: String, error: GmailError },
    /// Reply was sent but the dedup label was not applied
    RelabelFailed {
        message_id: String,
        to: String,
        error: GmailError,
    },
}

impl MessageOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            MessageOutcome::Replied { message_id, .. }
            | MessageOutcome::Skipped { message_id }
            | MessageOutcome::FetchFailed { message_id, .. }
            | MessageOutcome::ComposeFailed { message_id, .. }
            | MessageOutcome::SendFailed { message_id, .. }
            | MessageOutcome::RelabelFailed { message_id, .. } => message_id,
        }
    }

    /// Whether a reply went out for this message
    pub fn reply_sent(&self) -> bool {
        matches!(
            self,
            MessageOutcome::Replied { .. } | MessageOutcome::RelabelFailed { .. }
        )
    }
}

/// Summary of one poll tick
#[derive(Debug)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcomes: Vec<MessageOutcome>,
}

impl TickReport {
    fn count(&self, predicate: impl Fn(&MessageOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    pub fn candidates(&self) -> usize {
        self.outcomes.len()
    }

    pub fn replied(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Replied { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Skipped { .. }))
    }

    pub fn fetch_failed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::FetchFailed { .. }))
    }

    pub fn compose_failed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::ComposeFailed { .. }))
    }

    pub fn send_failed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::SendFailed { .. }))
    }

    pub fn relabel_failed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::RelabelFailed { .. }))
    }

    pub fn outcome_for(&self, message_id: &str) -> Option<&MessageOutcome> {
        self.outcomes.iter().find(|o| o.message_id() == message_id)
    }

    pub fn is_idle(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn log_summary(&self) {
        if self.is_idle() {
            debug!("Tick complete: no candidates");
            return;
        }

        info!(
            "Tick complete: {} candidates, {} replied, {} skipped, {} fetch failed, {} compose failed, {} send failed, {} relabel failed ({}ms)",
            self.candidates(),
            self.replied(),
            self.skipped(),
            self.fetch_failed(),
            self.compose_failed(),
            self.send_failed(),
            self.relabel_failed(),
            (self.completed_at - self.started_at).num_milliseconds()
        );
    }
}

/// Unattended auto-responder bound to one mailbox session
pub struct Responder<C, P> {
    client: C,
    composer: P,
    context: ResponderContext,
}

impl<C, P> Responder<C, P>
where
    C: MailboxClient,
    P: ReplyComposer,
{
    pub fn new(client: C, composer: P, context: ResponderContext) -> Self {
        Self {
            client,
            composer,
            context,
        }
    }

    /// Resolve the dedup label, then bind a responder to `client`
    ///
    /// Fails with a configuration error before any candidate is listed when
    /// the label does not exist.
    pub async fn bootstrap(client: C, composer: P, config: &ResponderConfig) -> Result<Self> {
        let dedup_label = LabelResolver::new(&client)
            .resolve(&config.label_name)
            .await?;
        let context = ResponderContext::new(dedup_label, config.source_label.clone());
        Ok(Self::new(client, composer, context))
    }

    pub fn context(&self) -> &ResponderContext {
        &self.context
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one full tick: list candidates, then handle each in turn
    ///
    /// Only a failure to list candidates fails the tick. Per-message
    /// failures are recorded in the report and never stop later candidates.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let started_at = Utc::now();
        let candidate_ids = self.client.list_unreplied_candidate_ids().await?;

        if candidate_ids.is_empty() {
            return Ok(TickReport {
                started_at,
                completed_at: Utc::now(),
                outcomes: Vec::new(),
            });
        }

        debug!("Found {} candidate messages", candidate_ids.len());
        let mut outcomes = Vec::with_capacity(candidate_ids.len());
        for id in &candidate_ids {
            outcomes.push(self.handle_message(id).await);
        }

        Ok(TickReport {
            started_at,
            completed_at: Utc::now(),
            outcomes,
        })
    }

    async fn handle_message(&self, id: &str) -> MessageOutcome {
        let message = match self.client.get_message(id).await {
            Ok(message) => message,
            Err(error) => {
                warn!("Failed to fetch message {}: {}", id, error);
                return MessageOutcome::FetchFailed {
                    message_id: id.to_string(),
                    error,
                };
            }
        };

        if !message.is_eligible() {
            debug!("Skipping message {}: already part of a reply chain", id);
            return MessageOutcome::Skipped {
                message_id: id.to_string(),
            };
        }

        let payload = match self.composer.compose(&message) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("Cannot compose reply for message {}: {}", id, error);
                return MessageOutcome::ComposeFailed {
                    message_id: id.to_string(),
                    error,
                };
            }
        };

        let sent_id = match self.client.send_reply(&payload).await {
            Ok(sent_id) => sent_id,
            Err(error) => {
                warn!(
                    "Failed to send reply for message {} to {}: {}. Will retry next tick",
                    id, payload.to, error
                );
                return MessageOutcome::SendFailed {
                    message_id: id.to_string(),
                    error,
                };
            }
        };
        info!("Sent auto-reply {} to {} for message {}", sent_id, payload.to, id);

        let relabel = self
            .client
            .relabel_message(
                id,
                self.context.dedup_label.id(),
                &self.context.source_label,
            )
            .await;

        match relabel {
            Ok(()) => MessageOutcome::Replied {
                message_id: id.to_string(),
                to: payload.to,
                sent_id,
            },
            Err(error) => {
                warn!(
                    "Reply sent for message {} but relabeling failed: {}. It may be answered again",
                    id, error
                );
                MessageOutcome::RelabelFailed {
                    message_id: id.to_string(),
                    to: payload.to,
                    error,
                }
            }
        }
    }

    /// Wait one freshly rolled delay, then run a tick
    pub async fn step<R, T>(
        &self,
        scheduler: &mut PollScheduler<R>,
        timer: &T,
    ) -> Result<TickReport>
    where
        R: Rng,
        T: Timer + ?Sized,
    {
        let delay = scheduler.next_delay();
        debug!("Next poll in {:?}", delay);
        timer.sleep(delay).await;
        self.run_tick().await
    }

    /// Poll until the process is terminated or a fatal error occurs
    ///
    /// A failed listing only costs that tick. An authorization failure
    /// (for example a revoked refresh token) can never recover on its own,
    /// so it ends the loop and is returned to the caller.
    pub async fn run_forever<R, T>(
        &self,
        scheduler: &mut PollScheduler<R>,
        timer: &T,
    ) -> Result<()>
    where
        R: Rng,
        T: Timer + ?Sized,
    {
        info!(
            "Auto-responder running; answered messages move to label '{}'",
            self.context.dedup_label.name()
        );

        loop {
            match self.step(scheduler, timer).await {
                Ok(report) => report.log_summary(),
                Err(e) if e.is_fatal() => {
                    error!("Stopping auto-responder: {}", e);
                    return Err(e);
                }
                Err(e) => warn!("Failed to list candidate messages: {}", e),
            }
        }
    }
}
