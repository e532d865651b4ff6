use abyss_http::codec::{HeaderEncoder, PayloadEncoder, read_request};
use abyss_http::connection::Connection;
use abyss_http::handler::{HandlerOutcome, handler_fn};
use abyss_http::protocol::{PayloadItem, ResponseHead};
use abyss_http::server::Server;
use bytes::BytesMut;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use http::StatusCode;
use std::{
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::runtime::Runtime;
use tokio_util::codec::Encoder;

const REQUEST: &[u8] = b"GET /index.html?lang=en HTTP/1.1\r\n\
Host: localhost:8080\r\n\
User-Agent: bench/1.0\r\n\
Accept: text/html,application/xhtml+xml\r\n\
Cookie: session=abc; theme=dark\r\n\
Connection: close\r\n\r\n";

// Mock IO for testing
struct MockIO {
    read_data: &'static [u8],
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: &'static [u8]) -> Self {
        Self { read_data, read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}

fn bench_read_request(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    c.bench_function("read_simple_request", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut conn = Connection::new(MockIO::new(REQUEST), peer());
            black_box(read_request(&mut conn, Duration::from_secs(1)).await.unwrap());
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let mut head = ResponseHead::with_status(StatusCode::OK);
    head.headers.set("Content-Type", "text/plain");
    head.headers.set("Transfer-Encoding", "chunked");
    head.headers.set("Date", "Thu, 01 Jan 1970 00:00:00 GMT");
    head.headers.set("Server", "abyss-http");

    c.bench_function("encode_chunked_response", |b| {
        b.iter(|| {
            let mut dst = BytesMut::new();
            HeaderEncoder.encode(&head, &mut dst).unwrap();
            let mut body = PayloadEncoder::chunked();
            for _ in 0..8 {
                body.encode(PayloadItem::Chunk(&b"Hello World!"[..]), &mut dst).unwrap();
            }
            body.encode(PayloadItem::<&[u8]>::Eof, &mut dst).unwrap();
            black_box(dst);
        });
    });
}

fn bench_connection(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let hello = handler_fn(|txn| {
        Box::pin(async move {
            txn.set_status(StatusCode::OK)?;
            txn.set_content_length(12)?;
            txn.write_body(b"Hello World!").await?;
            Ok(HandlerOutcome::Handled)
        })
    });
    let server = Server::builder().handler(hello).build().unwrap();

    c.bench_function("process_simple_request", |b| {
        b.to_async(&runtime).iter(|| async {
            server.run_conn(MockIO::new(REQUEST), peer()).await;
        });
    });
}

criterion_group!(benches, bench_read_request, bench_response_encoder, bench_connection);
criterion_main!(benches);
