use color_eyre::{eyre::eyre, Result};
use feedswitch::actuator::gpio::open_pins;
use feedswitch::actuator::Actuator;
use feedswitch::config::AgentConfig;
use feedswitch::dispatch::FeedDispatcher;
use feedswitch::mqtt::RumqttFactory;
use feedswitch::network::nmcli::NmcliLink;
use feedswitch::supervisor::platform::{CommandReset, Platform};
use feedswitch::supervisor::Agent;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let config = Arc::new(AgentConfig::load().await?);

    let (ch1, ch2) =
        open_pins(&config.outputs).map_err(|e| eyre!("Failed to open outputs: {}", e))?;
    let actuator =
        Actuator::new(ch1, ch2).map_err(|e| eyre!("Failed to initialise outputs: {}", e))?;
    let dispatcher = FeedDispatcher::new(config.feed_topics(), actuator);

    let platform = Platform {
        link: Box::new(NmcliLink::new(config.wifi.interface.clone())),
        transports: Box::new(RumqttFactory),
        process: Box::new(CommandReset::new(config.reset.clone())),
    };

    info!("Starting feedswitch");
    let mut agent = Agent::boot(config, platform, dispatcher);
    loop {
        agent = agent.run_cycle().await;
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging();
    Ok(())
}

fn setup_logging() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
