//! Route handlers, [`Flow`], and type erasure.
//!
//! # How a handler hands control back
//!
//! A custom route either answers the request or lets it carry on down the
//! pipeline (on to auto-routing, then the not-found page). Both cases give
//! the [`Request`] back, because the request owns the session data and the
//! template locals and the pipeline still needs them. [`Flow`] carries that
//! choice: `Continue(req)` or `Respond(req, res)`.
//!
//! # How async handlers are stored
//!
//! Every `async fn` has its own anonymous future type, so two handlers never
//! share a type. The [`Router`](crate::Router) still keeps them all in one
//! `HashMap<Method, Tree>`, which can only hold one concrete type. The
//! concrete handler is therefore hidden behind a trait object,
//! `dyn ErasedHandler`, and every route stores the same `BoxedHandler`.
//!
//! The chain from user code to the vtable call is:
//!
//! ```text
//! async fn confirm(req: Request) -> Flow          ← user writes this
//!        ↓ Router::post("/confirm", confirm)
//! confirm.into_boxed_handler()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(confirm))                    ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time              ← one vtable dispatch
//!        ↓
//! Box::pin(async { confirm(req).await.into_flow() })  ← BoxFuture
//! ```
//!
//! [`IntoFlow`] is what lets a handler return either a bare `Flow` or a
//! `Result<Flow, E>`: the wrapper converts both into `Result<Flow, Error>`,
//! so the pipeline sees a single shape and a failing handler ends on the
//! error page with the status its error maps to.
//!
//! [`Handler`] is sealed. Only the blanket impl over
//! `Fn(Request) -> impl Future` satisfies it, so the erasure above is the
//! one way a route gets stored and the trait can grow without breaking
//! callers.
//!
//! A matched request costs one `Arc` clone (an atomic increment, taken when
//! the router hands the handler out) and one virtual call. Requests that
//! match no route pay nothing here.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased, `Send` future.
///
/// `Pin<Box<…>>` because the runtime polls it in place. `Send` so tokio can
/// move it across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Flow ──────────────────────────────────────────────────────────────────────

/// What a pipeline stage decided.
pub enum Flow {
    /// Not handled here; the next stage gets the request.
    Continue(Request),
    /// Handled. The request comes back so its session can be saved.
    Respond(Request, Response),
}

impl Flow {
    pub fn respond(req: Request, response: impl IntoResponse) -> Self {
        Self::Respond(req, response.into_response())
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Conversion of a handler's return value into `Result<Flow, Error>`.
pub trait IntoFlow {
    fn into_flow(self) -> Result<Flow, Error>;
}

impl IntoFlow for Flow {
    fn into_flow(self) -> Result<Flow, Error> { Ok(self) }
}

impl<E: Into<Error>> IntoFlow for Result<Flow, E> {
    fn into_flow(self) -> Result<Flow, Error> { self.map_err(Into::into) }
}

// ── Erased handlers ───────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Flow, Error>>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any `async fn` (or closure) with the signature:
///
/// ```text
/// async fn name(req: Request) -> Flow
/// async fn name(req: Request) -> Result<Flow, E>   where E: Into<Error>
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Flow, Error>> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_flow() })
    }
}
