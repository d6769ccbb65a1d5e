//! `coppertail invoke` — the sample invocation command.
//!
//! Sends one JSON payload to a running endpoint and prints each streamed
//! line verbatim. Exits non-zero on transport failure.

use futures::StreamExt;

use coppertail_core::session::InvocationRequest;

pub async fn run(
    endpoint: &str,
    prompt: String,
    actor_id: Option<String>,
    session_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = InvocationRequest {
        prompt,
        actor_id,
        session_id,
    };

    let url = format!("{}/invocations", endpoint.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("endpoint returned {status}: {body}").into());
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            print!("{}", String::from_utf8_lossy(&line));
        }
    }
    if !buffer.is_empty() {
        println!("{}", String::from_utf8_lossy(&buffer));
    }

    Ok(())
}
