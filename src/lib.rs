pub mod config;
pub mod error;
pub mod network;
pub mod pow;
pub mod wallet;

pub use config::ClientConfig;
pub use error::{Result, WalletError};
pub use network::{NodeClient, RelayClient};
pub use wallet::{
    ClientContent, ClientResponse, ClientStatus, KeyVault, KeypairView, Make2WayPaymentResponse,
    MakePaymentResponse, Wallet,
};

/// Install the process-wide logger. `RUST_LOG` overrides the defaults;
/// later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper", log::LevelFilter::Warn)
        .filter_module("rustls", log::LevelFilter::Warn)
        .try_init();
}
