//! Payout Engine Entry Point
//!
//! Three invocation surfaces, wired for external schedulers (cron,
//! systemd timers) and admin use:
//!
//! ```text
//! payout_engine batch [--env dev]    process every PENDING withdrawal once
//! payout_engine sweep [--env dev]    re-verify parked withdrawals once
//! payout_engine retry <id> [--env dev]   admin retry of one withdrawal
//! ```

use std::sync::Arc;

use anyhow::{Context, bail};

use payout_engine::config::AppConfig;
use payout_engine::db::{Database, ensure_schema};
use payout_engine::logging::init_logging;
use payout_engine::manual::PgManualQueue;
use payout_engine::notify::LogNotifier;
use payout_engine::provider::{FlutterwaveClient, TransferProvider};
use payout_engine::wallet::PgWalletLedger;
use payout_engine::withdrawal::{
    BatchRunner, SweeperConfig, VerificationSweeper, WithdrawalId, WithdrawalProcessor,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

struct Engine {
    processor: Arc<WithdrawalProcessor>,
    provider: Arc<dyn TransferProvider>,
    sweeper_config: SweeperConfig,
}

async fn build_engine(config: &AppConfig) -> anyhow::Result<Engine> {
    let db = Database::connect(&config.postgres_url)
        .await
        .context("PostgreSQL connection failed")?;
    ensure_schema(db.pool()).await.context("schema bootstrap failed")?;

    let provider: Arc<dyn TransferProvider> = Arc::new(
        FlutterwaveClient::new(config.flutterwave.clone())
            .context("Flutterwave client construction failed")?,
    );

    let processor = Arc::new(WithdrawalProcessor::new(
        Arc::new(payout_engine::withdrawal::PgWithdrawalStore::new(
            db.pool().clone(),
        )),
        Arc::new(PgWalletLedger::new(db.pool().clone())),
        provider.clone(),
        Arc::new(PgManualQueue::new(db.pool().clone())),
        Arc::new(LogNotifier::new()),
    ));

    Ok(Engine {
        processor,
        provider,
        sweeper_config: SweeperConfig {
            max_verify_attempts: config.sweeper.max_verify_attempts,
        },
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("batch");

    let config = AppConfig::load(&get_env());
    let _guard = init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        command,
        "payout_engine starting"
    );

    let engine = build_engine(&config).await?;

    match command {
        "batch" => {
            let stats = BatchRunner::new(engine.processor)
                .process_all_pending()
                .await?;
            println!(
                "processed={} succeeded={} failed={}",
                stats.processed, stats.succeeded, stats.failed
            );
        }
        "sweep" => {
            let sweeper = VerificationSweeper::new(
                engine.processor,
                engine.provider,
                engine.sweeper_config,
            );
            let stats = sweeper.sweep_all().await?;
            println!(
                "swept={} completed={} failed={} unresolved={}",
                stats.swept, stats.completed, stats.failed, stats.unresolved
            );
        }
        "retry" => {
            let id = args
                .get(2)
                .context("usage: payout_engine retry <withdrawal_id>")?;
            let id: WithdrawalId = id
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid withdrawal id {}: {}", id, e))?;
            let outcome = engine.processor.process_withdrawal(id).await?;
            println!(
                "success={} status={} message={}",
                outcome.success, outcome.status, outcome.message
            );
        }
        other => bail!("unknown command: {} (expected batch, sweep or retry)", other),
    }

    Ok(())
}
