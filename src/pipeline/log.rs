use std::sync::Arc;

use serde_json::Value;

/// Sink for verification failures worth an operator's attention.
pub trait VerificationLogger: Send + Sync {
    fn error(&self, message: &str, context: Option<&Value>);
}

impl<T: VerificationLogger + ?Sized> VerificationLogger for Arc<T> {
    fn error(&self, message: &str, context: Option<&Value>) {
        (**self).error(message, context)
    }
}

/// Forwards to `tracing::error!` under the `mailverify` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl VerificationLogger for TracingLogger {
    fn error(&self, message: &str, context: Option<&Value>) {
        match context {
            Some(context) => tracing::error!(target: "mailverify", %context, "{message}"),
            None => tracing::error!(target: "mailverify", "{message}"),
        }
    }
}
