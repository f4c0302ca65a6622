//! # Per-request unit of work.
//!
//! [`handle`] runs one admitted request to completion: render, normalize,
//! deliver, account. It is spawned by the dispatcher as an independent task
//! and never awaited inline.
//!
//! ## Flow
//! ```text
//! publish RequestReceived
//!     │
//!     ▼
//! renderer.render() under catch_unwind
//!     ├─ Ok(rendered)  ──► RenderResponse::from (defaults at construction)
//!     ├─ Err(e)        ──► publish RenderFailed ──► 500 substitute
//!     └─ panic         ──► publish RenderFailed ──► 500 substitute
//!     ▼
//! sink.send_response(id, response)
//!     ├─ Ok            ──► (delivered)
//!     └─ Err           ──► publish ResponseAbandoned (swallowed)
//!     ▼
//! publish RequestCompleted ──► gate.down()
//! ```
//!
//! ## Rules
//! - Exactly **one** response per admitted request, on every path.
//! - A failed or panicking render never tears the dispatcher down.
//! - `gate.down()` runs unconditionally, last, so capacity is released on
//!   every path.

use std::rc::Rc;

use futures::FutureExt;

use crate::core::dispatcher::DispatchContext;
use crate::error::{DeliverError, RenderError};
use crate::events::{Event, EventKind};
use crate::host::{Incoming, RequestId};
use crate::render::RenderResponse;

/// Renders one request and delivers its response.
pub(crate) async fn handle(ctx: Rc<DispatchContext>, incoming: Incoming) {
    let Incoming { id, request } = incoming;

    publish_received(&ctx, id);

    let attempt = std::panic::AssertUnwindSafe(ctx.renderer.render(&request, &ctx.config))
        .catch_unwind()
        .await;

    let response = match attempt {
        Ok(Ok(rendered)) => RenderResponse::from(rendered),
        Ok(Err(err)) => substitute(&ctx, id, &err),
        Err(panic_err) => {
            let info = {
                let any = &*panic_err;
                if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                }
            };
            substitute(&ctx, id, &RenderError::Panicked { info })
        }
    };

    let status = response.status;
    if let Err(err) = ctx.sink.send_response(id, response).await {
        publish_abandoned(&ctx, id, err);
    }

    publish_completed(&ctx, id, status);
    ctx.gate.down();
}

/// Publishes `RenderFailed` and builds the 500 substitute response.
fn substitute(ctx: &DispatchContext, id: RequestId, err: &RenderError) -> RenderResponse {
    let text = err.to_string();
    ctx.bus.publish(
        Event::new(EventKind::RenderFailed)
            .with_request(id)
            .with_reason(text.clone()),
    );
    RenderResponse::failure(text)
}

/// Publishes the `RequestReceived` trace event.
fn publish_received(ctx: &DispatchContext, id: RequestId) {
    ctx.bus
        .publish(Event::new(EventKind::RequestReceived).with_request(id));
}

/// Publishes `ResponseAbandoned` with the delivery error label.
fn publish_abandoned(ctx: &DispatchContext, id: RequestId, err: DeliverError) {
    ctx.bus.publish(
        Event::new(EventKind::ResponseAbandoned)
            .with_request(id)
            .with_reason(err.as_label()),
    );
}

/// Publishes `RequestCompleted` with the delivered status.
fn publish_completed(ctx: &DispatchContext, id: RequestId, status: u16) {
    ctx.bus.publish(
        Event::new(EventKind::RequestCompleted)
            .with_request(id)
            .with_status(status),
    );
}
