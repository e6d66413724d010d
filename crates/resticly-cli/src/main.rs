//! Binary entrypoint for the Resticly CLI.

#[tokio::main]
async fn main() {
    std::process::exit(resticly_cli::run().await);
}
