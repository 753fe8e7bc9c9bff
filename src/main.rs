#[tokio::main]
async fn main() {
    if let Err(e) = chat_hub_lib::run().await {
        eprintln!("chat-hub: {}", e);
        std::process::exit(1);
    }
}
