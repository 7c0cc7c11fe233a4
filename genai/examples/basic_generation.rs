use genai::ClientBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("GENAI_API_KEY")?;
    let client = ClientBuilder::new(api_key).build()?;

    let response = client
        .generate_content()
        .with_system_instruction("Answer in one short paragraph.")
        .with_user_message("What is cursor-based pagination?")
        .with_temperature(0.3)
        .execute()
        .await?;

    println!("{}", response.text());
    Ok(())
}
