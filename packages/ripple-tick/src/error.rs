use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    #[error("no asynchronous primitive is available on this host")]
    NoPrimitive,
    #[error("the callback queue was dropped before the batch drained")]
    Dropped,
}

/// A failure raised by a deferred callback or a re-run action.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("error in {context}: {error}")]
    Failed {
        context: String,
        error: anyhow::Error,
    },
    #[error("panic in {context}: {message}")]
    Panicked { context: String, message: String },
}

impl CallbackError {
    pub fn context(&self) -> &str {
        match self {
            Self::Failed { context, .. } | Self::Panicked { context, .. } => context,
        }
    }
}

/// Receives every callback failure. Installed per queue.
pub type ErrorHandler = Rc<dyn Fn(&CallbackError)>;

pub(crate) fn log_error(error: &CallbackError) {
    tracing::error!(context = error.context(), "{}", error);
}

/// Runs `thunk`, converting both a returned error and a panic into a [`CallbackError`]
/// labelled with `context`.
pub fn guard<F>(thunk: F, context: &dyn fmt::Display) -> Result<(), CallbackError>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(thunk)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(CallbackError::Failed {
            context: context.to_string(),
            error,
        }),
        Err(payload) => Err(CallbackError::Panicked {
            context: context.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
