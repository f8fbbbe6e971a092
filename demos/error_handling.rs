//! Example demonstrating how callers branch on error kinds.
//!
//! Reads server URLs and the publisher from `CITYGRID_DEFAULT_URL`,
//! `CITYGRID_SECURE_URL` and `CITYGRID_PUBLISHER`.
//!
//! Run with: `cargo run --example error_handling`

use citygrid::{Client, EndpointDefinition, EndpointRegistry, Error, Params, ServerTarget, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("citygrid=debug")
        .init();

    let registry = EndpointRegistry::builder()
        .group("content", EndpointDefinition::new().server(ServerTarget::Default))
        .endpoint(
            "places",
            EndpointDefinition::new()
                .parent("content")
                .path("/content/places/v2/search/where"),
        )
        .endpoint(
            "offers",
            EndpointDefinition::new()
                .server(ServerTarget::Secure)
                .path("/content/offers/v2"),
        )
        .build()?;

    let client = Client::builder()
        .settings(Settings::from_env()?)
        .registry(registry)
        .build()?;

    println!("=== Example 1: Publisher-scoped search ===");
    let params = Params::new().param("what", "pizza").param("where", "90069");
    match client.endpoint("places")?.request_with_publisher(params).await {
        Ok(result) => println!("Success: {:?}", result.get("results")),
        Err(Error::Api { message, errors, .. }) => {
            println!("API rejected the request: {}", message);
            println!("  {} error(s) reported", errors.len());
        }
        Err(Error::InvalidResponseFormat(info)) => {
            println!("Unexpected response format");
            println!("  Server message: {:?}", info.server_message);
            println!("  Description: {:?}", info.description);
        }
        Err(e) if e.is_retryable() => println!("Transport failure, safe to retry: {}", e),
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Mutation without a token ===");
    match client.endpoint("offers")?.mutate(Params::new().param("offer_id", 1)).await {
        Err(Error::MissingAuthToken) => println!("Caught client defect: {}", Error::MissingAuthToken),
        other => println!("Unexpected outcome: {:?}", other.map(|r| r.data)),
    }

    Ok(())
}
