//! Thin entrypoint delegating to [`pgdev_cli::run`].

#[tokio::main]
async fn main() {
    std::process::exit(pgdev_cli::run().await);
}
