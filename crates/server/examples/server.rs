use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use strand_http::protocol::{Chunk, RequestHead, ResponseHead};
use strand_server::{Callbacks, HttpServer, WeakConnection};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn respond(conn: &WeakConnection, mut response: ResponseHead, body: &'static str) {
    response.add_server_header().add_date_header();
    if let Ok(content_type) = HeaderValue::from_str(mime::TEXT_PLAIN_UTF_8.as_ref()) {
        response.add_header(header::CONTENT_TYPE, content_type);
    }
    if let Err(e) = conn.send(response, Bytes::from_static(body.as_bytes())) {
        warn!(id = conn.id(), cause = %e, "can't send response");
    }
}

fn on_request(conn: WeakConnection, request: &RequestHead, body: &Bytes) {
    info!(id = conn.id(), method = %request.method(), uri = request.uri(), body_len = body.len(), "received request");
    if request.headers().is_chunked() {
        // answered once the last chunk arrived
        return;
    }

    if request.uri() != "/hello" {
        respond(&conn, ResponseHead::response(StatusCode::NOT_FOUND), "404 not found\n");
        return;
    }

    match *request.method() {
        Method::GET | Method::PUT => respond(&conn, ResponseHead::response(StatusCode::OK), "Hello World!\n"),
        _ => {
            let mut response = ResponseHead::response(StatusCode::METHOD_NOT_ALLOWED);
            response.add_header(header::ALLOW, HeaderValue::from_static("GET, PUT"));
            respond(&conn, response, "405 method not allowed\n");
        }
    }
}

fn on_chunk(conn: WeakConnection, chunk: &Chunk, data: &Bytes) {
    info!(id = conn.id(), size = chunk.size(), extension = chunk.extension(), last = chunk.is_last(), "received chunk");
    if chunk.is_last() {
        for field in chunk.trailers() {
            info!(id = conn.id(), name = field.name(), value = field.value(), "trailer");
        }
        respond(&conn, ResponseHead::response(StatusCode::OK), "chunks received\n");
    } else {
        info!(id = conn.id(), len = data.len(), "chunk data");
    }
}

fn on_expect_continue(conn: WeakConnection, request: &RequestHead, _body: &Bytes) {
    info!(id = conn.id(), uri = request.uri(), length = ?request.content_length().ok().flatten(), "expect continue");
    if let Err(e) = conn.continue_or_reject(request) {
        warn!(id = conn.id(), cause = %e, "can't answer expect-continue");
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let callbacks = Callbacks::new()
        .on_request(on_request)
        .on_chunk(on_chunk)
        .on_expect_continue(on_expect_continue)
        .on_disconnect(|conn| info!(id = conn.id(), "client disconnected"));

    let server = HttpServer::new(callbacks);
    if let Err(e) = server.accept(8080).await {
        error!(cause = %e, "can't start server");
        return;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(cause = %e, "can't listen for ctrl-c");
    }
    server.shutdown().await;
}
