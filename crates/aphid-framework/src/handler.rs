//! Command handlers and the tower services that invoke them.
//!
//! A command handler is any async function taking the module singleton, the
//! handler context, the message and the bound arguments:
//!
//! ```rust,ignore
//! async fn greet(
//!     greeter: Arc<Greeter>,
//!     ctx: Arc<AphidContext>,
//!     message: Arc<Message>,
//!     args: CommandArgs,
//! ) -> HandlerResult {
//!     message.reply(format!("Hello from {}", ctx.author())).await?;
//!     Ok(())
//! }
//! ```
//!
//! [`MethodService`] wraps such a function as a `tower::Service<Invocation>`;
//! the container stores it type-erased as a [`BoxedCommandService`].

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};

use aphid_core::{Component, Message, ServiceArc};
use async_trait::async_trait;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service};

use crate::args::CommandArgs;
use crate::context::AphidContext;
use crate::error::{HandlerResult, InvocationError};

// ============================================================================
// IntoReply - Handle handler return values
// ============================================================================

/// Types a command handler may return.
///
/// Text is sent back through the message's channel; errors are passed up to
/// the dispatcher.
#[async_trait]
pub trait IntoReply: Send + 'static {
    async fn into_reply(self, message: &Message) -> HandlerResult;
}

#[async_trait]
impl IntoReply for () {
    async fn into_reply(self, _message: &Message) -> HandlerResult {
        Ok(())
    }
}

#[async_trait]
impl IntoReply for String {
    async fn into_reply(self, message: &Message) -> HandlerResult {
        message.reply(&self).await?;
        Ok(())
    }
}

#[async_trait]
impl IntoReply for &'static str {
    async fn into_reply(self, message: &Message) -> HandlerResult {
        message.reply(self).await?;
        Ok(())
    }
}

/// `None` sends nothing.
#[async_trait]
impl<T: IntoReply> IntoReply for Option<T> {
    async fn into_reply(self, message: &Message) -> HandlerResult {
        match self {
            Some(reply) => reply.into_reply(message).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError> + Send + 'static,
{
    async fn into_reply(self, message: &Message) -> HandlerResult {
        match self {
            Ok(reply) => reply.into_reply(message).await,
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// CommandHandler
// ============================================================================

/// An async function implementing a command of module `M`.
///
/// Implemented for every `Fn(Arc<M>, Arc<AphidContext>, Arc<Message>,
/// CommandArgs) -> impl Future` whose output implements [`IntoReply`].
pub trait CommandHandler<M>: Clone + Send + Sync + 'static {
    type Reply: IntoReply;

    fn call(
        &self,
        module: Arc<M>,
        context: Arc<AphidContext>,
        message: Arc<Message>,
        args: CommandArgs,
    ) -> BoxFuture<'static, Self::Reply>;
}

impl<M, F, Fut> CommandHandler<M> for F
where
    M: Send + Sync + 'static,
    F: Fn(Arc<M>, Arc<AphidContext>, Arc<Message>, CommandArgs) -> Fut
        + Clone
        + Send
        + Sync
        + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoReply,
{
    type Reply = Fut::Output;

    fn call(
        &self,
        module: Arc<M>,
        context: Arc<AphidContext>,
        message: Arc<Message>,
        args: CommandArgs,
    ) -> BoxFuture<'static, Self::Reply> {
        Box::pin((self)(module, context, message, args))
    }
}

// ============================================================================
// Invocation / MethodService
// ============================================================================

/// The request handed to a command service.
#[derive(Clone)]
pub struct Invocation {
    /// The module singleton, type-erased.
    pub module: ServiceArc,
    pub context: Arc<AphidContext>,
    pub message: Arc<Message>,
    pub args: CommandArgs,
}

/// A type-erased command service as stored by the container.
pub type BoxedCommandService = BoxCloneSyncService<Invocation, (), BoxError>;

/// Calls a [`CommandHandler`] of module `M`.
///
/// Fails with [`InvocationError::ModuleType`] when the invocation carries an
/// instance that is not an `M`.
pub struct MethodService<M, H> {
    handler: H,
    _marker: PhantomData<fn() -> M>,
}

impl<M, H: Clone> Clone for MethodService<M, H> {
    fn clone(&self) -> Self {
        MethodService {
            handler: self.handler.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M, H> MethodService<M, H>
where
    M: Component,
    H: CommandHandler<M>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    /// Wraps the service as a [`BoxedCommandService`].
    pub fn boxed(self) -> BoxedCommandService {
        BoxCloneSyncService::new(self)
    }
}

impl<M, H> Service<Invocation> for MethodService<M, H>
where
    M: Component,
    H: CommandHandler<M>,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Invocation) -> Self::Future {
        let handler = self.handler.clone();
        Box::pin(async move {
            let module = req
                .module
                .downcast::<M>()
                .map_err(|_| InvocationError::ModuleType { expected: M::NAME })?;
            let message = Arc::clone(&req.message);
            let reply = handler
                .call(module, req.context, req.message, req.args)
                .await;
            reply.into_reply(&message).await
        })
    }
}
