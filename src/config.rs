//! CLI/file/environment configuration, layered with `clap` over the `config`
//! crate exactly as the teacher's `interledger-settlement-engines::main`
//! layers `ArgMatches` over a `config::File` over `config::Environment`,
//! simplified to a single command since this engine has exactly one ledger
//! backend rather than the teacher's per-ledger subcommands.

use crate::errors::ConfigError;
use clap::{crate_version, App, Arg};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_PREFIX: &str = "ILP_SETTLEMENT";

#[derive(Debug, Clone, Deserialize)]
pub struct EngineOpt {
    pub torii_url: String,
    pub connector_url: String,
    pub iroha_account_id: String,
    pub keypair_name: String,
    pub asset_id: String,
    pub asset_scale: u8,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_bind_port() -> u16 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// The decoded keypair loaded from `<keypair-name>.priv`/`<keypair-name>.pub`,
/// mirroring the way the teacher's ethereum engine decodes its hex-encoded
/// private key material with the `hex` crate.
pub struct Keypair {
    pub public_key: Vec<u8>,
    pub private_key: Vec<u8>,
}

pub fn load_keypair(keypair_name: &str) -> Result<Keypair, ConfigError> {
    let priv_path = format!("{}.priv", keypair_name);
    let pub_path = format!("{}.pub", keypair_name);
    let private_key = read_hex_file(&priv_path)?;
    let public_key = read_hex_file(&pub_path)?;
    Ok(Keypair {
        public_key,
        private_key,
    })
}

fn read_hex_file(path: &str) -> Result<Vec<u8>, ConfigError> {
    let contents =
        fs::read_to_string(Path::new(path)).map_err(|err| ConfigError::KeyFile(path.to_owned(), err))?;
    hex::decode(contents.trim()).map_err(|err| ConfigError::KeyHex(path.to_owned(), err))
}

/// Parses CLI args, merges a config file (positional argument) and
/// environment variables (prefix `ILP_SETTLEMENT_`), and validates the
/// result into an [`EngineOpt`].
pub fn load_config<I, T>(args: I) -> Result<EngineOpt, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_app().get_matches_from(args);

    let mut settings = config::Config::new();
    settings.merge(config::Environment::with_prefix(ENV_PREFIX))?;
    if let Some(path) = matches.value_of("config") {
        settings.merge(config::File::with_name(path))?;
    }
    for key in &[
        "torii-url",
        "connector-url",
        "iroha-account-id",
        "keypair-name",
        "asset-id",
        "asset-scale",
        "bind-port",
        "redis-url",
        "poll-interval-ms",
    ] {
        if let Some(value) = matches.value_of(key) {
            settings.set(&key.replace('-', "_"), value)?;
        }
    }

    let opt: EngineOpt = settings.try_into()?;
    if opt.asset_scale > 18 {
        return Err(ConfigError::InvalidAssetScale(opt.asset_scale));
    }
    Ok(opt)
}

fn build_app() -> App<'static, 'static> {
    App::new("ilp-iroha-settlement-engine")
        .about("Interledger settlement engine for an Iroha-backed ledger")
        .version(crate_version!())
        .args(&[
            Arg::with_name("config")
                .takes_value(true)
                .index(1)
                .help("Name of config file (in JSON, TOML, or YAML format)"),
            Arg::with_name("torii-url")
                .long("torii-url")
                .takes_value(true)
                .help("Iroha torii gate endpoint"),
            Arg::with_name("connector-url")
                .long("connector-url")
                .takes_value(true)
                .default_value("http://127.0.0.1:7771")
                .help("Local connector's Settlement Engine API endpoint"),
            Arg::with_name("iroha-account-id")
                .long("iroha-account-id")
                .takes_value(true)
                .help("This engine's own ledger account, e.g. alice@domain"),
            Arg::with_name("keypair-name")
                .long("keypair-name")
                .takes_value(true)
                .help("Filesystem prefix for <prefix>.priv / <prefix>.pub keypair files"),
            Arg::with_name("asset-id")
                .long("asset-id")
                .takes_value(true)
                .help("The asset this engine settles, e.g. coin0#domain"),
            Arg::with_name("asset-scale")
                .long("asset-scale")
                .takes_value(true)
                .help("Number of decimal digits this engine reports amounts at"),
            Arg::with_name("bind-port")
                .long("bind-port")
                .takes_value(true)
                .default_value("3000")
                .help("Port the control surface listens on"),
            Arg::with_name("redis-url")
                .long("redis-url")
                .takes_value(true)
                .help("Redis connection string; omit to use an in-memory store"),
            Arg::with_name("poll-interval-ms")
                .long("poll-interval-ms")
                .takes_value(true)
                .default_value("1000")
                .help("Incoming observer tick period in milliseconds"),
        ])
}
