//! Resolution of the dedup label name to its provider id
use crate::client::MailboxClient;
use crate::error::{GmailError, Result};
use crate::models::Label;
use tracing::{debug, info};

/// Dedup label fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabel {
    label: Label,
}

impl ResolvedLabel {
    pub fn id(&self) -> &str {
        &self.label.id
    }

    pub fn name(&self) -> &str {
        &self.label.name
    }
}

impl From<Label> for ResolvedLabel {
    fn from(label: Label) -> Self {
        Self { label }
    }
}

/// Looks up the dedup label once at startup
///
/// The label doubles as the record of handled messages, so a missing label
/// is a configuration error. It is never created on the fly.
pub struct LabelResolver<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C> LabelResolver<'a, C>
where
    C: MailboxClient + ?Sized,
{
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Resolve `label_name` by exact, case-sensitive match
    pub async fn resolve(&self, label_name: &str) -> Result<ResolvedLabel> {
        let labels = self.client.list_labels().await?;
        debug!("Scanning {} labels for '{}'", labels.len(), label_name);

        let label = find_label(labels, label_name).ok_or_else(|| {
            GmailError::ConfigError(format!(
                "Dedup label '{}' does not exist in this mailbox; create it before starting",
                label_name
            ))
        })?;

        info!("Resolved dedup label '{}' to id {}", label.name, label.id);
        Ok(ResolvedLabel::from(label))
    }
}

fn find_label(labels: Vec<Label>, name: &str) -> Option<Label> {
    labels.into_iter().find(|label| label.name == name)
}
