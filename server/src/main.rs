use {
    launchpad_server::{
        config::{ConfigError, ServerConfig},
        http, logging, rpc_app_state, Cluster,
    },
    log::{error, info, warn},
    std::process::exit,
};

#[tokio::main]
async fn main() {
    logging::setup();

    let config = match ServerConfig::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Cli(err)) => err.exit(),
        Err(err) => {
            error!("{err}");
            exit(1);
        }
    };
    info!("starting with {config:?}");
    if config.cluster.parse::<Cluster>().is_err() {
        warn!(
            "cluster {:?} is not devnet or mainnet; provisioning will fail after submitting",
            config.cluster
        );
    }

    let router = http::router(rpc_app_state(&config));
    if let Err(err) = http::serve(config.socket_addr(), router, http::shutdown_signal()).await {
        error!("server error: {err}");
        exit(1);
    }
}
