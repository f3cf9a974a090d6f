//! Place a single outbound call whose webhooks point at the published tunnel.

use anyhow::Context;
use callbot::twilio::{CallRequest, TwilioClient, TwilioConfig, read_published_url};
use utils::tunnel::TunnelConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::load_dotenv();
    utils::logging::init_tracing();

    let url_file = TunnelConfig::from_env().url_file;
    let base_url = read_published_url(&url_file)
        .await
        .context("run publish-tunnel (or the server) first")?;

    let config = TwilioConfig::from_env()?;
    let request = {
        let (from, to) = config.call_numbers()?;
        CallRequest::for_base_url(&base_url, from, to)
    };
    tracing::info!("Calling {} with webhook {}", request.to, request.url);

    let client = TwilioClient::new(config)?;
    let call_sid = client.create_call(&request).await?;

    println!("{}", call_sid);
    Ok(())
}
