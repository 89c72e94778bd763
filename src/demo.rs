//! `demo` subcommand — one request's context lifecycle, start to finish.

use std::sync::Arc;

use chrono::Utc;
use reqctx_store::{ClearHandler, RequestContextStore, RequestHandler, RequestScope, StoreError, WriterSink};
use serde_json::json;
use tracing::info;

use crate::RunResult;

/// Auth stage stores who is calling; the response stage reads it back.
struct DemoHandler;

impl RequestHandler for DemoHandler {
    type Output = Result<String, StoreError>;

    async fn handle(&self, scope: &RequestScope) -> Self::Output {
        scope.set("user", "alice");
        scope.set("role", "admin");
        scope.set_serialized("startedAt", &Utc::now())?;

        let mut stdout = WriterSink::new(std::io::stdout().lock());
        scope.store().print_data(scope.id(), &mut stdout)?;

        let user = scope.get("user");
        let role = scope.get("role");
        Ok(format!(
            "{} ({})",
            user.as_str().unwrap_or("anonymous"),
            role.as_str().unwrap_or("none")
        ))
    }
}

pub async fn run_demo(store: Arc<RequestContextStore>) -> RunResult {
    // A request with an explicitly cleared context.
    store.set("req1", "user", "alice");
    store.set("req1", "role", "admin");
    store.set("req1", "token", serde_json::Value::Null);
    info!("req1 context: {}", json!(store.get_all("req1")));
    info!("req1 token set explicitly: {}", store.get_ok("req1", "token").is_some());

    {
        let mut stdout = WriterSink::new(std::io::stdout().lock());
        store.print_all(&mut stdout)?;
    }

    store.clear("req1");
    let (bag, found) = store.get_all_ok("req1");
    info!("req1 after clear: found={found}, keys={}", bag.len());

    // A request served through the guaranteed-cleanup wrapper.
    let handler = ClearHandler::new(Arc::clone(&store), DemoHandler);
    let served = handler.serve_new().await?;
    info!("Served {served}");

    if !store.is_empty() {
        return Err(format!("Contexts left behind: {:?}", store.request_ids()).into());
    }
    Ok(())
}
