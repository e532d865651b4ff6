//! The keep-alive loop that serves one connection.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::codec::read_request;
use crate::connection::{Connection, WorkerStatus};
use crate::protocol::{HttpError, ParseError, RequestHead};
use crate::server::server::ServerInner;
use crate::transaction::Transaction;

/// Serves transactions on `conn` until keep-alive ends, the peer goes away,
/// or the server or worker is shut down.
pub(crate) async fn serve(mut conn: Connection, server: Arc<ServerInner>, status: Arc<WorkerStatus>) {
    let peer = conn.peer_addr();
    let config = &server.config;
    info!(%peer, "connection accepted");

    let mut served = 0u32;
    loop {
        conn.read_init();

        // an idle connection closes quietly; only a started request earns a 408
        if conn.bytes_available() == 0 {
            let idle = tokio::select! {
                () = server.cancel.cancelled() => {
                    debug!(%peer, "server terminating, closing idle connection");
                    break;
                }
                read = conn.read(config.keep_alive_timeout()) => read,
            };
            if let Err(e) = idle {
                debug!(%peer, served, cause = %e, "no request arrived, closing idle connection");
                break;
            }
        }

        let allow_keep_alive = served + 1 < config.keep_alive_max() && !server.cancel.is_cancelled() && status.is_connected();
        let result = process_request(&mut conn, &server, allow_keep_alive).await;
        served += 1;

        match result {
            Ok(true) => debug!(%peer, served, "keeping connection alive"),
            Ok(false) => break,
            Err(e) => {
                error!(%peer, cause = %e, "transaction failed, connection shutdown");
                break;
            }
        }
    }

    conn.shutdown().await;
    info!(%peer, served, "finished process, connection shutdown");
}

/// Reads, dispatches and answers one request. Returns whether the connection
/// may serve another one.
async fn process_request(conn: &mut Connection, server: &ServerInner, allow_keep_alive: bool) -> Result<bool, HttpError> {
    let request = match read_request(conn, server.config.timeout()).await {
        Ok(request) => request,
        Err(e) => return reject(conn, server, e).await,
    };

    let mut txn = Transaction::new(conn, &server.config, &server.date, request, allow_keep_alive);
    let version = txn.version();

    if version.major >= 2 {
        let explanation = format!("Request is in HTTP Version {}. We understand only HTTP 1", version.major);
        txn.send_error(StatusCode::HTTP_VERSION_NOT_SUPPORTED, Some(&explanation)).await?;
    } else {
        match server.handlers.dispatch(&mut txn).await {
            Ok(_) => {
                if !txn.is_ended() {
                    txn.write_end().await?;
                }
            }
            Err(e) if !txn.is_started() => {
                error!(uri = txn.uri(), cause = %e, "handler failed");
                txn.send_error(StatusCode::INTERNAL_SERVER_ERROR, None).await?;
            }
            Err(e) => {
                error!(uri = txn.uri(), cause = %e, "handler failed after the response started, abandoning connection");
                return Ok(false);
            }
        }
    }

    let keep_alive = txn.finish();
    let entry = txn.log_entry();
    server.log_transaction(&entry).await;
    Ok(keep_alive)
}

/// Answers a request that could not be read, when an answer is possible.
async fn reject(conn: &mut Connection, server: &ServerInner, e: ParseError) -> Result<bool, HttpError> {
    let peer = conn.peer_addr();
    match e.status_code() {
        Some(status) => {
            warn!(%peer, cause = %e, "can't receive next request");
            let mut txn = Transaction::new(conn, &server.config, &server.date, RequestHead::default(), false);
            txn.send_error(status, None).await?;
            let entry = txn.log_entry();
            server.log_transaction(&entry).await;
        }
        None => debug!(%peer, cause = %e, "connection ended while reading request"),
    }
    Ok(false)
}
