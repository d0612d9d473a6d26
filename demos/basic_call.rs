//! Basic example demonstrating simple GET and POST requests through curl.
//!
//! This example shows how to:
//! - Make a one-off request
//! - Create a client instance with a base URL and default headers
//! - Send a JSON body and decode a JSON response
//! - Access status, headers and cookies
//!
//! Run with: `cargo run --example basic_call`

use curlew::{Error, InstanceConfig, RequestOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("curlew=debug,basic_call=info")
        .init();

    println!("=== One-off Request ===");
    let url = "https://jsonplaceholder.typicode.com/posts/1";
    let response = curlew::request(url, RequestOptions::new()).await?;
    println!("Status code: {}", response.status_code);
    println!("Content-Type: {:?}", response.header("content-type"));
    println!("Cookies: {:?}", response.headers.set_cookie());
    println!();

    let api = curlew::create_instance(
        InstanceConfig::new()
            .with_base_url("https://jsonplaceholder.typicode.com")
            .with_header("Accept", "application/json"),
    );

    println!("=== GET Request Example ===");
    let response = api.get::<Post>("/posts/1").await?;
    println!("Post ID: {}", response.body.id);
    println!("Title: {}", response.body.title);
    println!("Request latency: {:?}", response.latency);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let response = api.post::<_, Post>("/posts", &new_post).await?;
    println!("Status code: {}", response.status_code);
    println!("Created post ID: {}", response.body.id);
    println!("Was retried: {}", response.was_retried());

    Ok(())
}
