//! Lyra daemon
//!
//! Long-running process that hosts every Lyra service. Background cognition and the threat
//! patrol run on their own timers; each stdin line of the form `agent: query` is answered
//! with one JSON envelope on stdout.

use std::sync::Arc;

use lyra_agents::{names, Services};
use lyra_core::{CoreConfig, LogSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file if present (before config reads the environment)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[lyra-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match CoreConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let services = Services::build(&config);
    let background = services.start_background(Arc::new(LogSink));
    tracing::info!(
        tick_secs = config.daemon.tick().as_secs(),
        agents = ?services.bus.agent_names(),
        "Lyra daemon started"
    );

    let tick_every = config.daemon.tick();
    let mut heartbeat = interval_at(Instant::now() + tick_every, tick_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => tick(&services),
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(reply) = handle_line(&services, &line).await {
                        println!("{}", reply);
                    }
                }
                Ok(None) => {
                    tracing::info!("stdin closed; background loops keep running until CTRL-C");
                    tokio::signal::ctrl_c().await.ok();
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down daemon");
                break;
            }
        }
    }

    background.abort();
}

/// Answer one `agent: query` line. Lines without an agent prefix go to the assistant.
async fn handle_line(services: &Services, line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (agent, query) = match line.split_once(':') {
        Some((agent, query)) if services.bus.agent(agent.trim()).is_some() => (agent.trim(), query.trim()),
        _ => (names::LYRA, line),
    };

    let response = services.answer(agent, query).await;
    match response.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(agent, error = %e, "failed to serialize response");
            None
        }
    }
}

fn tick(services: &Services) {
    let status = services.coordinator.status();
    let emotion = services.cognition.current_emotion();
    tracing::info!(
        pipeline = ?status.status,
        active_requests = status.active_request_count,
        completed = status.completed_task_count,
        thoughts = services.cognition.thought_count(),
        dreams = services.cognition.dream_count(),
        emotion = %emotion.primary,
        security_score = services.threats.security_score(),
        routed = services.bus.audit_len(),
        "heartbeat"
    );
}
