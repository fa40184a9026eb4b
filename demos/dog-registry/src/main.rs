//! optimist demo - optimistic page edits
//!
//! Edits a person and their favourite dogs against a registry that takes a
//! while to answer. The page shows each edit at once; rapid edits from one
//! form coalesce so only the latest is sent after the first.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use optimist_core::OptimistResult;
use optimist_runtime::observability::init_logging;
use optimist_runtime::{RuntimeConfig, Session};

use dog_registry::{apply_route_action, render, ApplyRouteFn, DogForm, DogRegistry, PersonForm};

const DEFAULT_LATENCY_MS: u64 = 500;

#[tokio::main]
async fn main() -> OptimistResult<()> {
    let config = RuntimeConfig::from_env();
    init_logging(config.log_format);

    let latency = std::env::var("DOG_REGISTRY_LATENCY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_LATENCY_MS);
    let registry = Arc::new(DogRegistry::sample(Duration::from_millis(latency)));

    let mut session = Session::start(
        config,
        apply_route_action as ApplyRouteFn,
        Arc::clone(&registry),
        Arc::clone(&registry),
    )
    .await?;

    let mut views = session.subscribe();
    let watcher = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            if let Some(view) = views.borrow_and_update().as_ref() {
                info!(average_love = view.average_love(), "view changed");
            }
        }
    });

    println!("{}", render(&session.view()?, session.is_saving()));

    let person = PersonForm::new(session.submitter());
    let willow = DogForm::new("abc-123", session.submitter());
    let noodle = DogForm::new("def-456", session.submitter());

    person.rename("Andrew")?;
    willow.edit("Willow", "4", "100")?;
    willow.edit("Willow", "5", "100")?;
    willow.edit("Willow", "6", "100")?;
    noodle.edit("Noodle", "4", "80")?;

    info!(person = %person.handle(), willow = %willow.handle(), noodle = %noodle.handle(), "forms mounted");

    if let Err(e) = noodle.edit("Noodle", "four", "80") {
        println!("Rejected edit for {}: {e}\n", noodle.dog_id());
    }

    println!("After edits (server not yet answered):");
    println!("{}", render(&session.view()?, session.is_saving()));
    println!("Server has:\n{}", render(&registry.snapshot(), false));

    let reports = session.run_until_idle().await?;
    for report in &reports {
        info!(handle = %report.handle, completion = ?report.completion, ok = report.outcome.is_ok(), "settled");
    }

    println!("After settling {} requests:", reports.len());
    println!("{}", render(&session.view()?, session.is_saving()));

    let stats = session.stats();
    println!(
        "submissions {} dispatches {} coalesced {}",
        stats.submissions, stats.dispatches, stats.coalesced
    );

    drop(session);
    watcher.abort();
    Ok(())
}
