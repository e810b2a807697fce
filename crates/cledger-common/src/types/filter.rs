//! Query filters for compliance actions
//!
//! [`ActionFilter`] is the wire form accepted from clients (everything
//! optional, statuses as free strings). [`ActionFilter::resolve`] turns it into
//! [`ActionCriteria`], the typed form every read backend evaluates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActionStatus, ComplianceAction, Severity};
use crate::error::{CommonError, Result};

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Upper bound on a single page, regardless of what the client asks for
pub const MAX_PAGE_SIZE: i64 = 200;

/// Client-supplied list filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    /// Substring over policy id, action code and description, ignoring ASCII case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// Typed, normalized filter
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCriteria {
    pub status: Option<ActionStatus>,
    pub severity: Option<Severity>,
    pub policy_id: Option<String>,
    /// Search needle with ASCII letters lower-cased
    pub text: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl ActionFilter {
    pub fn with_status(mut self, status: ActionStatus) -> Self {
        self.status = Some(status.as_str().to_string());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Normalize and type-check the filter
    ///
    /// `default_limit` applies when no limit was given; the result is capped at
    /// `max_limit`. Negative offsets are treated as zero.
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> Result<ActionCriteria> {
        let status = non_blank(&self.status).map(str::parse).transpose()?;
        let severity = non_blank(&self.severity).map(str::parse).transpose()?;

        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(CommonError::validation(
                    "'since' must not be later than 'until'",
                ));
            }
        }

        let max_limit = max_limit.max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);

        Ok(ActionCriteria {
            status,
            severity,
            policy_id: non_blank(&self.policy_id).map(str::to_string),
            text: non_blank(&self.q).map(str::to_ascii_lowercase),
            since: self.since,
            until: self.until,
            limit,
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

impl ActionCriteria {
    /// Client-side evaluation, used wherever the backend cannot filter itself
    pub fn matches(&self, action: &ComplianceAction) -> bool {
        if self.status.is_some_and(|s| s != action.status) {
            return false;
        }
        if self.severity.is_some_and(|s| s != action.severity) {
            return false;
        }
        if let Some(ref policy_id) = self.policy_id {
            if &action.policy_id != policy_id {
                return false;
            }
        }
        if self.since.is_some_and(|since| action.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| action.timestamp > until) {
            return false;
        }
        if let Some(ref needle) = self.text {
            let haystacks = [
                Some(action.policy_id.as_str()),
                Some(action.action_taken.as_str()),
                action.threat_description.as_deref(),
            ];
            return haystacks
                .into_iter()
                .flatten()
                .any(|h| h.to_ascii_lowercase().contains(needle));
        }
        true
    }

    /// Sort newest first, then apply offset and limit
    pub fn paginate(&self, mut actions: Vec<ComplianceAction>) -> Vec<ComplianceAction> {
        actions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        actions
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
