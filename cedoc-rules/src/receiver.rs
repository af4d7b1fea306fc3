//! Validation sessions.
//!
//! A [`DocumentValidator`] sits between an event producer and an
//! [`EventReceiver`]: each event is validated first and forwarded only if
//! it is legal. The first failure poisons the session.
//!
//! ```text
//! producer ──event──▶ DocumentValidator ──event──▶ receiver
//!                          │
//!                    Context + RuleHandler
//! ```

use std::convert::Infallible;

use tracing::debug;

use crate::context::Context;
use crate::dispatch::{dispatch, RuleHandler, StructureChecker};
use crate::error::{RuleError, SessionError};
use crate::event::Event;
use crate::options::RuleOptions;
use crate::rule::RuleId;

/// Downstream consumer of validated events.
pub trait EventReceiver {
    type Error: std::error::Error + 'static;

    fn on_event(&mut self, event: &Event<'_>) -> Result<(), Self::Error>;
}

/// Receiver that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReceiver;

impl EventReceiver for NullReceiver {
    type Error = Infallible;

    #[inline]
    fn on_event(&mut self, _event: &Event<'_>) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Receiver that records the method name of every event it sees.
#[derive(Debug, Clone, Default)]
pub struct MethodLog {
    pub methods: Vec<&'static str>,
}

impl EventReceiver for MethodLog {
    type Error = Infallible;

    fn on_event(&mut self, event: &Event<'_>) -> Result<(), Infallible> {
        self.methods.push(event.method().name());
        Ok(())
    }
}

/// One validation session over one document.
#[derive(Debug)]
pub struct DocumentValidator<R, H = StructureChecker> {
    ctx: Context,
    handler: H,
    receiver: R,
    failed: bool,
}

impl<R: EventReceiver> DocumentValidator<R> {
    pub fn new(receiver: R) -> Self {
        Self::with_options(receiver, RuleOptions::default())
    }

    pub fn with_options(receiver: R, options: RuleOptions) -> Self {
        Self::with_handler(receiver, Context::with_options(options), StructureChecker)
    }
}

impl<R: EventReceiver, H: RuleHandler> DocumentValidator<R, H> {
    /// Build a session from a prepared context and a custom handler.
    pub fn with_handler(receiver: R, ctx: Context, handler: H) -> Self {
        Self {
            ctx,
            handler,
            receiver,
            failed: false,
        }
    }

    /// Validate `event` and forward it.
    pub fn feed(&mut self, event: &Event<'_>) -> Result<(), SessionError<R::Error>> {
        if self.failed {
            return Err(RuleError::Aborted.into());
        }
        if let Err(err) = dispatch(&mut self.ctx, &mut self.handler, event) {
            self.failed = true;
            debug!(
                error = %err,
                stack = ?self.ctx.breadcrumbs(),
                "validation aborted"
            );
            return Err(err.into());
        }
        self.receiver.on_event(event).map_err(|err| {
            self.failed = true;
            debug!(error = %err, "receiver aborted");
            SessionError::Receiver(err)
        })
    }

    /// Feed every event in order, stopping at the first failure.
    pub fn feed_all<'a, 'e, I>(&mut self, events: I) -> Result<(), SessionError<R::Error>>
    where
        I: IntoIterator<Item = &'e Event<'a>>,
        'a: 'e,
    {
        for event in events {
            self.feed(event)?;
        }
        Ok(())
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// End the session, handing back the receiver.
    ///
    /// Fails unless the document was ended.
    pub fn finish(self) -> Result<R, RuleError> {
        if self.failed {
            return Err(RuleError::Aborted);
        }
        if self.ctx.rule() != RuleId::Terminal {
            return Err(RuleError::IncompleteDocument {
                rule: self.ctx.rule().name(),
            });
        }
        Ok(self.receiver)
    }
}

/// Validate a complete document.
pub fn validate<'a, 'e, I>(events: I) -> Result<(), RuleError>
where
    I: IntoIterator<Item = &'e Event<'a>>,
    'a: 'e,
{
    validate_with(events, RuleOptions::default())
}

/// Validate a complete document under `options`.
pub fn validate_with<'a, 'e, I>(events: I, options: RuleOptions) -> Result<(), RuleError>
where
    I: IntoIterator<Item = &'e Event<'a>>,
    'a: 'e,
{
    let mut session = DocumentValidator::with_options(NullReceiver, options);
    for event in events {
        session.feed(event).map_err(|err| match err {
            SessionError::Rules(err) => err,
            SessionError::Receiver(never) => match never {},
        })?;
    }
    session.finish().map(|_| ())
}
