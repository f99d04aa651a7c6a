//! Thin entrypoint for the `diskpull` binary.

#[tokio::main]
async fn main() {
    let code = diskpull_cli::run().await;
    std::process::exit(code);
}
