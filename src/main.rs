use ilp_iroha_settlement_engine::client::ConnectorClient;
use ilp_iroha_settlement_engine::config;
use ilp_iroha_settlement_engine::engine::{EngineConfig, SettlementEngine};
use ilp_iroha_settlement_engine::ledger::unconfigured::UnconfiguredLedgerClient;
use ilp_iroha_settlement_engine::ledger::LedgerClient;
use ilp_iroha_settlement_engine::observer::IncomingObserver;
use ilp_iroha_settlement_engine::store::memory::InMemoryStore;
use ilp_iroha_settlement_engine::{api, store::SettlementStore};
use std::net::SocketAddr;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt = match config::load_config(std::env::args_os()) {
        Ok(opt) => opt,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            exit(1);
        }
    };

    if let Err(err) = config::load_keypair(&opt.keypair_name) {
        error!(error = %err, "failed to load keypair");
        exit(1);
    }

    let ledger = Arc::new(UnconfiguredLedgerClient);
    if let Err(err) = ledger.get_account(&opt.iroha_account_id).await {
        error!(error = %err, "ledger liveness probe failed");
        exit(1);
    }

    let engine_config = EngineConfig {
        self_ledger_account: opt.iroha_account_id.clone(),
        asset: opt.asset_id.clone(),
        asset_scale: opt.asset_scale,
    };

    #[cfg(feature = "redis-store")]
    {
        if let Some(redis_url) = opt.redis_url.clone() {
            let builder = ilp_iroha_settlement_engine::store::redis_store::RedisStoreBuilder::new(redis_url);
            let store = match builder.connect().await {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    error!(error = %err, "failed to connect to redis");
                    exit(1);
                }
            };
            run(store, ledger, engine_config, &opt).await;
            return;
        }
    }

    let store = Arc::new(InMemoryStore::new());
    run(store, ledger, engine_config, &opt).await;
}

async fn run<S, L>(store: Arc<S>, ledger: Arc<L>, engine_config: EngineConfig, opt: &config::EngineOpt)
where
    S: SettlementStore + 'static,
    L: LedgerClient + 'static,
{
    let connector = ConnectorClient::new(
        opt.connector_url
            .parse()
            .expect("connector-url must be a valid URL"),
    );
    let engine = Arc::new(SettlementEngine::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        engine_config.clone(),
    ));

    let observer = Arc::new(IncomingObserver::new(
        store,
        ledger,
        connector.clone(),
        Arc::new(engine_config),
    ));
    let poll_interval = Duration::from_millis(opt.poll_interval_ms);
    tokio::spawn(async move { observer.run(poll_interval).await });

    let filter = api::create_control_surface_filter(engine, connector);
    let addr: SocketAddr = ([0, 0, 0, 0], opt.bind_port).into();
    let (_, serve) = warp::serve(filter).bind_with_graceful_shutdown(addr, async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    });
    serve.await;
}
