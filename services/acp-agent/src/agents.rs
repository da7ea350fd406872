//! Agent wiring: credentials, marketplace connection, runtimes

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use acp_agents::env::ledger_signer_from_env;
use acp_agents::{
    AgentRole, AgentRuntime, BuyerAgent, BuyerConfig, RunSummary, RuntimeConfig, SellerAgent,
    SellerConfig, TaskHandler, WalletCredentials,
};
use acp_ledger::{Database, MemoryChain};
use acp_sim::LocalMarketplace;
use acp_types::{AgentProfile, EvmAddress, JobId, JobOffering, JobStatus, Notification, Phase};

const OUTCOME_POLL: Duration = Duration::from_millis(50);

/// Profile the seller publishes for browsing
fn seller_profile(wallet_address: &EvmAddress) -> AgentProfile {
    AgentProfile {
        name: "Chromia's EVAL seller".to_string(),
        description: "Responds to evaluation requests and records results on Chromia".to_string(),
        wallet_address: wallet_address.clone(),
        successful_job_count: 0,
        success_rate: 0.0,
        unique_buyer_count: 0,
        minutes_from_last_online: 0,
        graduated: false,
        online: true,
        job_offerings: vec![JobOffering {
            name: "evaluation".to_string(),
            price: 0.01,
            provider_address: wallet_address.clone(),
        }],
    }
}

async fn until_stopped(mut stopped: watch::Receiver<bool>) {
    let _ = stopped.wait_for(|stop| *stop).await;
}

fn spawn_runtime<H: TaskHandler>(
    agent: Arc<H>,
    inbox: tokio::sync::mpsc::Receiver<Notification>,
    config: RuntimeConfig,
    stopped: watch::Receiver<bool>,
) -> JoinHandle<RunSummary> {
    let runtime = AgentRuntime::new(agent, inbox, config);
    tokio::spawn(runtime.run(until_stopped(stopped)))
}

fn credentials(role: AgentRole) -> anyhow::Result<WalletCredentials> {
    let credentials = WalletCredentials::from_env(role)
        .with_context(|| format!("loading {} credentials", role))?;
    tracing::info!(
        %role,
        entity_id = credentials.entity_id,
        wallet = %credentials.agent_wallet_address,
        "Starting ACP client"
    );
    Ok(credentials)
}

fn ledger() -> anyhow::Result<Database> {
    let signer = ledger_signer_from_env().context("loading ledger key")?;
    let database = Database::new(Arc::new(MemoryChain::new()), signer);
    tracing::info!(signer = %database.signer().public_key_hex(), "Ledger database initialized");
    Ok(database)
}

/// Buyer and seller need a marketplace both can reach. The only one this
/// binary has lives in process, so each role alone would talk to nobody.
pub fn standalone_role(role: AgentRole) -> anyhow::Result<()> {
    anyhow::bail!(
        "standalone {} needs an external ACP backend; run `acp-agent demo` to start buyer and seller on the local marketplace",
        role
    )
}

/// Register the seller profile and run the seller runtime
fn start_seller(
    market: &LocalMarketplace,
    credentials: &WalletCredentials,
    database: Database,
    config: RuntimeConfig,
    reject_after_payment: bool,
    stopped: watch::Receiver<bool>,
) -> JoinHandle<RunSummary> {
    market.register_agent(seller_profile(&credentials.agent_wallet_address));
    let (client, inbox) = market.connect_with(credentials);
    let seller = Arc::new(SellerAgent::new(
        Arc::new(client),
        database,
        SellerConfig {
            reject_after_payment,
        },
    ));

    tracing::info!(
        reject_after_payment = seller.config().reject_after_payment,
        "Seller agent is running, waiting for new tasks..."
    );
    spawn_runtime(seller, inbox, config, stopped)
}

/// Start the buyer runtime, then initiate a job
async fn start_buyer(
    market: &LocalMarketplace,
    credentials: &WalletCredentials,
    config: RuntimeConfig,
    stopped: watch::Receiver<bool>,
) -> anyhow::Result<(JobId, JoinHandle<RunSummary>)> {
    let (client, inbox) = market.connect_with(credentials);
    let buyer = Arc::new(BuyerAgent::new(Arc::new(client), BuyerConfig::default()));
    tracing::info!(keyword = %buyer.config().browse.keyword, "Buyer agent is browsing for sellers");
    let handle = spawn_runtime(buyer.clone(), inbox, config, stopped);

    match buyer.initiate_job().await {
        Ok(job_id) => {
            tracing::info!(job_id = %job_id, "Listening for next steps...");
            Ok((job_id, handle))
        }
        Err(e) => {
            handle.abort();
            Err(e).context("initiating job")
        }
    }
}

fn log_summary(role: AgentRole, summary: &RunSummary) {
    tracing::info!(
        %role,
        handled = summary.handled,
        failed = summary.failed,
        aborted = summary.aborted,
        "Agent finished"
    );
}

/// Seller and buyer on one marketplace, credentials from the environment
pub async fn run_demo(
    config: RuntimeConfig,
    reject_after_payment: bool,
    stop: watch::Sender<bool>,
) -> anyhow::Result<()> {
    let seller = credentials(AgentRole::Seller)?;
    let database = ledger()?;
    let buyer = credentials(AgentRole::Buyer)?;

    let market = LocalMarketplace::new();
    run_local(
        &market,
        &buyer,
        &seller,
        database,
        config,
        reject_after_payment,
        stop,
    )
    .await?;
    Ok(())
}

/// Run both agents until the job settles on the ledger or a shutdown is
/// signalled. Returns the last phase seen.
async fn run_local(
    market: &LocalMarketplace,
    buyer_credentials: &WalletCredentials,
    seller_credentials: &WalletCredentials,
    database: Database,
    config: RuntimeConfig,
    reject_after_payment: bool,
    stop: watch::Sender<bool>,
) -> anyhow::Result<Option<Phase>> {
    let seller = start_seller(
        market,
        seller_credentials,
        database.clone(),
        config.clone(),
        reject_after_payment,
        stop.subscribe(),
    );
    let (job_id, buyer) =
        match start_buyer(market, buyer_credentials, config, stop.subscribe()).await {
            Ok(started) => started,
            Err(e) => {
                let _ = stop.send(true);
                let _ = seller.await;
                return Err(e);
            }
        };

    let mut stopped = stop.subscribe();
    let outcome = tokio::select! {
        outcome = settled(market, &database, job_id) => {
            let phase = outcome?;
            tracing::info!(job_id = %job_id, %phase, "Job settled");
            Some(phase)
        }
        _ = stopped.wait_for(|stop| *stop) => None,
    };
    let _ = stop.send(true);

    log_summary(AgentRole::Buyer, &buyer.await?);
    log_summary(AgentRole::Seller, &seller.await?);

    for record in database.get_all_jobs().await? {
        tracing::info!(
            id = %record.id,
            client = %record.evm_address,
            status = %record.status,
            result = %record.result,
            "Ledger record"
        );
    }
    Ok(outcome)
}

/// Resolve once the job is terminal and, when completed, its ledger record
/// says so too.
async fn settled(market: &LocalMarketplace, database: &Database, job_id: JobId) -> anyhow::Result<Phase> {
    loop {
        let Some(job) = market.job(job_id) else {
            anyhow::bail!("job {} disappeared from the marketplace", job_id);
        };
        if job.phase.is_terminal() {
            if job.phase == Phase::Rejected {
                return Ok(Phase::Rejected);
            }
            let record = database.get_job(&job_id.to_string()).await?;
            if record.map(|r| r.status) == Some(JobStatus::Completed) {
                return Ok(Phase::Completed);
            }
        }
        tokio::time::sleep(OUTCOME_POLL).await;
    }
}
