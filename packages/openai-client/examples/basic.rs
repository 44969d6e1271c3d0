//! Basic OpenAI client usage example

use openai_client::{InputMessage, OpenAIClient, ResponsesRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize from environment
    let client = OpenAIClient::from_env()?;

    println!("=== Response ===");
    let response = client
        .create_response(
            ResponsesRequest::new("gpt-4.1-mini")
                .message(InputMessage::system("You are a helpful assistant."))
                .message(InputMessage::user("What is Rust in one sentence?"))
                .temperature(0.2)
                .max_output_tokens(100),
        )
        .await?;

    println!("Response: {}", response.text);
    if let Some(usage) = response.usage {
        println!("Tokens: {} in / {} out", usage.input_tokens, usage.output_tokens);
    }

    Ok(())
}
