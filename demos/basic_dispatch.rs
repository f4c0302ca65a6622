//! # Example: basic_dispatch
//!
//! Minimal example of a single dispatcher on one thread, no pool, no
//! subscribers.
//!
//! Demonstrates how to:
//! - Wire a host with [`channel`] and [`ChannelHost`].
//! - Define a render routine with [`RenderFn`].
//! - Drive [`Dispatcher::run`] inside a `LocalSet` and stop it with a
//!   cancellation token.
//! - See a render failure come back as a 500 substitute response.
//!
//! ## Flow
//! ```text
//! handle.render(req) ──► queue ──► ChannelHost ──► Dispatcher
//!     │                                               ├─► gate.ready / up
//!     │                                               └─► handle(req)
//!     │                                                     ├─ render
//!     ◄───────────────── oneshot ◄───────────────────────── └─ deliver
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_dispatch
//! ```

use std::rc::Rc;

use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;

use rendervisor::{
    channel, Bus, ChannelHost, DispatchConfig, Dispatcher, RenderError, RenderFn, RenderRequest,
    Rendered,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Host side: a handle to submit requests, a receiver to serve them
    let (handle, receiver) = channel(32);
    let host = Rc::new(ChannelHost::new(receiver, None));

    // 2. Event bus (no subscribers here; see `pooled` for logging)
    let bus = Bus::new(64);

    // 3. A render routine: greets every path, fails on /boom
    let renderer = RenderFn::rc(
        "greeter",
        |req: RenderRequest, _cfg: serde_json::Value| async move {
            if req.uri == "/boom" {
                return Err(RenderError::failed("nothing to render here"));
            }
            Ok(Rendered::default()
                .with_status(200)
                .with_field("body", format!("<h1>hello {}</h1>", req.uri)))
        },
    );

    // 4. Dispatcher with default limits
    let dispatcher = Dispatcher::new(
        &DispatchConfig::default(),
        host.clone(),
        host.clone(),
        renderer,
        bus,
    );
    let token = CancellationToken::new();

    // 5. Everything runs on this one thread
    let local = LocalSet::new();
    local
        .run_until(async {
            let run = tokio::task::spawn_local(dispatcher.run(token.clone()));

            for uri in ["/", "/about", "/boom"] {
                let response = handle.render(RenderRequest::get(uri)).await?;
                println!(
                    "{uri} -> {} {}",
                    response.status,
                    response.fields.get("body").map(String::as_str).unwrap_or("")
                );
            }

            token.cancel();
            run.await??;
            Ok(())
        })
        .await
}
