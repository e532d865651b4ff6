use abyss_http::handler::{HandlerOutcome, handler_fn};
use abyss_http::server::{Server, ServerConfig};
use http::StatusCode;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let hello = handler_fn(|txn| {
        Box::pin(async move {
            if txn.uri() != "/" {
                return Ok(HandlerOutcome::Declined);
            }
            info!(host = ?txn.request().host(), "saying hello");

            let body = "Hello World!\r\n";
            txn.set_status(StatusCode::OK)?;
            txn.set_content_type(&mime::TEXT_PLAIN_UTF_8)?;
            txn.set_content_length(body.len() as u64)?;
            txn.write_body(body.as_bytes()).await?;
            Ok(HandlerOutcome::Handled)
        })
    });

    let config = ServerConfig::builder()
        .name("hello")
        .port(3000)
        .keep_alive_timeout(Duration::from_secs(5))
        .log_file("access.log")
        .build();

    let server = match Server::builder().config(config).handler(hello).build() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "failed to build server");
            return;
        }
    };

    let stopper = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.terminate();
        }
    });

    if let Err(e) = server.run().await {
        error!(cause = %e, "server stopped");
    }
}
