//! Listen on the pull channel and print every frame.
//!
//! Authentication comes from the environment:
//!
//! - `PULL_COOKIES`: `name=value; name=value` cookie string, must contain `c_user`
//! - `PULL_DTSG`: anti-forgery token
//! - `PULL_REVISION`: client revision
//! - `PULL_CONFIG`: optional JSON client configuration
//!
//! Run with: cargo run --example listen

use anyhow::{anyhow, Context};
use futures::StreamExt;
use pull_channel_http::client::{ClientConfig, Listener, PullSession, ReqwestTransport};
use pull_channel_http::AuthContext;
use std::collections::BTreeMap;

fn parse_cookies(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match std::env::var("PULL_CONFIG") {
        Ok(text) => ClientConfig::from_json(&text)?,
        Err(_) => ClientConfig::default(),
    };

    let cookies = parse_cookies(&std::env::var("PULL_COOKIES").context("PULL_COOKIES not set")?);
    let auth = AuthContext::from_cookies(
        cookies,
        std::env::var("PULL_DTSG").context("PULL_DTSG not set")?,
        std::env::var("PULL_REVISION").context("PULL_REVISION not set")?,
    )
    .ok_or_else(|| anyhow!("PULL_COOKIES has no c_user cookie"))?;

    let transport = ReqwestTransport::new(&config)?.with_auth(auth);
    let listener = Listener::new(PullSession::with_config(config), transport);
    let session = listener.session();
    let mut frames = listener.listen();

    println!("Listening on the pull channel");
    println!("=============================\n");

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => println!("seq {}: {}", session.lock().tracker().sequence(), frame),
            Err(e) => {
                eprintln!("Protocol error: {e}");
                if let Some(payload) = e.payload() {
                    eprintln!("  payload: {payload}");
                }
                return Err(e.into());
            }
        }
    }

    Ok(())
}
