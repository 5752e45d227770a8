//! # Transport Seam
//!
//! [`Transport`] delivers a finished payload to one wire operation and
//! returns the raw response, uninterpreted. Faults and connectivity errors
//! come back as [`TransportError`]; nothing here retries.

use parking_lot::Mutex;

use nfse_core::{Operation, TransportError};

/// Sends finished request documents to the authority.
pub trait Transport: Send + Sync {
    /// Send `payload` to `operation` and return the raw response body.
    fn send(&self, payload: &str, operation: Operation) -> Result<String, TransportError>;
}

/// One recorded [`MockTransport`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub operation: Operation,
    pub payload: String,
}

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Fault { status: u16, body: String },
}

/// Transport that records every request and answers from a canned reply.
#[derive(Debug)]
pub struct MockTransport {
    reply: Reply,
    sent: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
    /// Answer every request with `body`.
    pub fn responding(body: impl Into<String>) -> Self {
        Self {
            reply: Reply::Body(body.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with an HTTP fault.
    pub fn faulting(status: u16, body: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fault {
                status,
                body: body.into(),
            },
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order.
    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    /// Number of `send` calls.
    pub fn call_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::responding("")
    }
}

impl Transport for MockTransport {
    fn send(&self, payload: &str, operation: Operation) -> Result<String, TransportError> {
        self.sent.lock().push(SentRequest {
            operation,
            payload: payload.to_string(),
        });
        match &self.reply {
            Reply::Body(body) => Ok(body.clone()),
            Reply::Fault { status, body } => Err(TransportError::Fault {
                operation: operation.descriptor().wire_name.to_string(),
                status: *status,
                body: body.clone(),
            }),
        }
    }
}
