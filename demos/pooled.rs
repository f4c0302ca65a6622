//! # Example: pooled
//!
//! A small SSR front: worker pool, index-page template, logging subscriber.
//!
//! Demonstrates how to:
//! - Hand a renderer factory to [`RenderPool`] (one renderer per worker
//!   thread, built on that thread).
//! - Attach the built-in [`LogWriter`] to the pool's bus through
//!   [`SubscriberSet`].
//! - Pass a host configuration blob down to every render call.
//! - Assemble a page from response fields with [`PageTemplate`].
//! - Shut the pool down and watch worker events drain through the logger.
//!
//! ## Flow
//! ```text
//! pool.render(req) ──► supervise ──► shared queue ──► worker thread
//!                          │                            ├─► Dispatcher
//!                          │ scale / gc                 └─► renderer
//!                          ▼
//!                    worker events ──► Bus ──► SubscriberSet ──► LogWriter
//! ```
//!
//! ## Run
//! Requires the `pool` and `logging` features.
//! ```bash
//! cargo run --example pooled --features pool,logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use rendervisor::{
    DispatchConfig, LogWriter, PageTemplate, PoolConfig, RenderFn, RenderPool, RenderRequest,
    Rendered, RendererFactory, Subscribe, SubscriberSet,
};

const INDEX: &str = "<html><head><!--ssr-head--></head><body><!--ssr-body--></body></html>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Renderer factory: called on each worker thread
    let factory: RendererFactory = Arc::new(|| {
        Box::new(RenderFn::new(
            "site",
            |req: RenderRequest, cfg: Value| async move {
                let site = cfg["site"].as_str().unwrap_or("site").to_string();
                match req.uri.as_str() {
                    "/" => Ok(Rendered::default()
                        .with_status(200)
                        .with_field("head", format!("<title>{site}</title>"))
                        .with_field("body", "<h1>Home</h1>")),
                    // Unknown route: empty render, status defaults to 404
                    _ => Ok(Rendered::default()),
                }
            },
        ))
    });

    // 2. Pool: defaults except a small worker cap and event ring for the demo
    let pool = RenderPool::new(
        PoolConfig {
            max_workers: 2,
            bus_capacity: 64,
            ..PoolConfig::default()
        },
        DispatchConfig::default(),
        Some(json!({ "site": "rendervisor demo" })),
        factory,
    );

    // 3. Built-in logger fanned out behind the pool's bus
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let set = Arc::new(SubscriberSet::new(subs, pool.bus().clone()));
    let _listener = set.spawn_listener(pool.bus());

    // 4. Render a few pages and assemble them with the index template
    let template = PageTemplate::new(INDEX);
    for uri in ["/", "/missing"] {
        let response = pool.render(RenderRequest::get(uri)).await?;
        println!("--- {uri} ({})", response.status);
        println!("{}", template.apply(&response.fields));
    }

    // 5. Wind the pool down; worker events drain through the logger
    pool.shutdown();
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(())
}
