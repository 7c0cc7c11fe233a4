use futures::TryStreamExt;
use genai::{ClientBuilder, ListParams};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("GENAI_API_KEY")?;
    let client = ClientBuilder::new(api_key).build()?;

    let mut models = client.list_models(ListParams::new().with_page_size(25)).await?;
    println!("first page has {} models", models.page().len());

    let mut items = std::pin::pin!(models.items());
    while let Some(model) = items.try_next().await? {
        println!("{} ({} input tokens)", model.name, model.input_token_limit);
    }
    Ok(())
}
