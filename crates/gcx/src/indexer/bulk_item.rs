use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::error;

use crate::backends::BulkResponseItem;

pub type SuccessCallback = Box<dyn FnOnce(&BulkResponseItem) + Send>;
pub type FailureCallback =
    Box<dyn FnOnce(Option<&BulkResponseItem>, Option<&anyhow::Error>) + Send>;

/// 📦 One `index` action, pre-serialized, with whatever should happen once its fate is known.
///
/// The document is turned into JSON on the way in, so a document that can't be
/// serialized is the caller's error and never reaches a worker.
pub struct BulkItem {
    document: String,
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
}

impl BulkItem {
    pub fn index<T: Serialize>(document: &T) -> Result<Self> {
        let document = serde_json::to_string(document).context(
            "💀 A document refused to become JSON. serde looked at it, sighed, and went home.",
        )?;
        Ok(Self {
            document,
            on_success: None,
            on_failure: None,
        })
    }

    pub fn with_on_success(mut self, callback: impl FnOnce(&BulkResponseItem) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// 🚨 Replaces the default failure callback, which logs the error.
    pub fn with_on_failure(
        mut self,
        callback: impl FnOnce(Option<&BulkResponseItem>, Option<&anyhow::Error>) + Send + 'static,
    ) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// 📏 Bytes this item adds to a `_bulk` body: the action line, the document, two newlines.
    pub(crate) fn encoded_len(&self, action_line: &str) -> usize {
        action_line.len() + self.document.len() + 2
    }

    pub(crate) fn succeed(self, verdict: &BulkResponseItem) {
        if let Some(callback) = self.on_success {
            callback(verdict);
        }
    }

    pub(crate) fn fail(self, verdict: Option<&BulkResponseItem>, err: Option<&anyhow::Error>) {
        match self.on_failure {
            Some(callback) => callback(verdict, err),
            None => log_failure(verdict, err),
        }
    }
}

impl fmt::Debug for BulkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkItem")
            .field("document", &self.document)
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// 🚨 The default eulogy for a document that didn't make it.
pub(crate) fn log_failure(verdict: Option<&BulkResponseItem>, err: Option<&anyhow::Error>) {
    if let Some(err) = err {
        error!("ERROR: {:#}", err);
    } else if let Some(item_error) = verdict.and_then(|v| v.error.as_ref()) {
        error!("ERROR: {}: {}", item_error.kind, item_error.reason);
    } else if let Some(verdict) = verdict {
        error!("ERROR: status {} for document '{}'", verdict.status, verdict.document_id);
    }
}
