use std::env;

use anyhow::Context;
use env_logger::Env;
use log::info;

use heart_rate_peripheral::bluer_gateway::BluerGateway;
use heart_rate_peripheral::prelude::*;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
  let config = match env::args_os().nth(1) {
    Some(path) => PeripheralConfig::load(&path)
      .with_context(|| format!("loading {}", path.to_string_lossy()))?,
    None => PeripheralConfig::default(),
  };
  env_logger::Builder::from_env(Env::default().default_filter_or(&config.log_filter)).init();

  let session = bluer::Session::new().await?;
  let adapter = session.default_adapter().await?;
  info!("Using adapter {}", adapter.name());

  let (events_tx, mut events_rx) = event_channel();
  let gateway = BluerGateway::new(adapter, tokio::runtime::Handle::current());
  let mut controller = PeripheralController::new(gateway, events_tx, config);
  controller.initialize()?;

  println!("Heart rate peripheral running. Press Ctrl-C to exit.");
  loop {
    tokio::select! {
      result = tokio::signal::ctrl_c() => {
        result.context("waiting for Ctrl-C")?;
        break;
      }
      Some(event) = events_rx.recv() => controller.on_event(event),
    }
  }

  controller.shutdown();
  Ok(())
}
