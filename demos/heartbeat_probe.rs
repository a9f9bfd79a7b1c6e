//! Heartbeat probe
//!
//! Runs one probe against the server named by the environment and exits with
//! status 1 when anything went wrong.
//!
//! ```text
//! TESTENV_WEB_URL=http://localhost:3003 \
//! TESTENV_WS_COOKIE='irc-hybrid-client=s%3A...' \
//! SHOWWEBSOCKET=1 \
//! cargo run -p wsprobe --example heartbeat_probe
//! ```

use wsprobe::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    wsprobe::client::init_logging()?;

    let client = ProbeClient::from_env()?;
    let config = client.config();
    println!(
        "Probing {}://{}:{}{}",
        if config.tls.is_some() { "wss" } else { "ws" },
        config.host,
        config.port,
        config.path
    );

    let report = client.run().await?;
    println!("{}", report);

    match report.error_message() {
        Some(message) => {
            eprintln!("Websocket test failed:\n{}", message);
            std::process::exit(1);
        }
        None => {
            println!(
                "Websocket test passed: {} pong(s), {} heartbeat(s)",
                report.pong_count, report.heartbeat_count
            );
            Ok(())
        }
    }
}
