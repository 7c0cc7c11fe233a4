use std::sync::Arc;

use async_trait::async_trait;
use genai::common::Modality;
use genai_live::{
    ClientContentParams, LiveBackend, LiveClient, LiveConnectConfig, LiveHandler, ServerMessage,
};

struct Printer;

#[async_trait]
impl LiveHandler for Printer {
    async fn on_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::ServerContent(content) => {
                if let Some(text) = content.text() {
                    print!("{text}");
                }
                if content.turn_complete.unwrap_or(false) {
                    println!();
                }
            }
            ServerMessage::GoAway(notice) => {
                eprintln!("server will close the connection in {:?}", notice.time_left);
            }
            _ => {}
        }
    }

    async fn on_close(&self) {
        eprintln!("connection closed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("GENAI_API_KEY")?;
    let client = LiveClient::new(LiveBackend::Studio { api_key });

    let config = LiveConnectConfig::default()
        .with_response_modalities(vec![Modality::Text])
        .with_system_instruction("Keep answers brief.");

    let session = client
        .connect("models/gemini-2.5-flash", config, Arc::new(Printer))
        .await?;

    session.send_client_content(ClientContentParams::new("Tell me a two-line poem."))?;

    // Give the model time to answer before hanging up.
    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    session.close();
    Ok(())
}
