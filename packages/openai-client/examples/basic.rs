//! Send one image and a question to a vision model.
//!
//! Usage: cargo run -p openai-client --example basic -- page.png

use openai_client::{ChatRequest, ContentPart, Message, OpenAIClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).ok_or("usage: basic <image.png>")?;
    let png = std::fs::read(&path)?;

    let client = OpenAIClient::from_env()?;

    let response = client
        .chat_completion(
            ChatRequest::new("gpt-4o")
                .message(Message::user_parts(vec![
                    ContentPart::text("Describe this document in one sentence."),
                    ContentPart::png(&png),
                ]))
                .temperature(0.0)
                .token_limit(200),
        )
        .await?;

    println!("Response: {}", response.content);
    if let Some(usage) = response.usage {
        println!("Tokens used: {}", usage.total_tokens);
    }

    Ok(())
}
