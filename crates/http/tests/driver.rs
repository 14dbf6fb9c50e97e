use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode};
use strand_http::codec::ResponseDecoder;
use strand_http::config::{ConnectionConfig, ParserConfig};
use strand_http::connection::{ConnectionDriver, Event};
use strand_http::protocol::{BodyItem, Headers, LastChunk, Message, ParseError, PayloadSize, ResponseHead};
use tokio_util::codec::Decoder;

fn output(driver: &mut ConnectionDriver) -> String {
    driver.take_output().map(|bytes| String::from_utf8(bytes.to_vec()).unwrap()).unwrap_or_default()
}

fn events(driver: &mut ConnectionDriver) -> Vec<Event> {
    std::iter::from_fn(|| driver.poll_event()).collect()
}

fn ok() -> ResponseHead {
    ResponseHead::response(StatusCode::OK)
}

#[test]
fn hello_world() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nUser-Agent: curl/7.79.1\r\n\r\n");

    let Some(Event::Request { head, body }) = driver.poll_event() else { panic!("expected a request") };
    assert_eq!(head.method(), &Method::GET);
    assert_eq!(head.uri(), "/hello");
    assert_eq!(head.headers().find("user-agent"), Some("curl/7.79.1"));
    assert!(body.is_empty());

    let mut response = ok();
    response.headers_mut().insert("Content-Type", "text/plain").unwrap();
    driver.send_response(response, Bytes::from_static(b"Hello World!")).unwrap();

    assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 12\r\n\r\nHello World!");
    assert!(!driver.should_close());
}

#[test]
fn chunked_request_events() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");

    let Some(Event::Request { head, body }) = driver.poll_event() else { panic!("expected a request") };
    assert_eq!(head.uri(), "/upload");
    assert!(body.is_empty());
    assert!(driver.poll_event().is_none());

    driver.receive(b"1a; name=first\r\nabcdefghijklmnopqrstuvwxyz\r\n");
    let Some(Event::Chunk(chunk)) = driver.poll_event() else { panic!("expected a chunk") };
    assert_eq!(chunk.size(), 26);
    assert_eq!(chunk.hex_size(), "1a");
    assert_eq!(chunk.extension(), "name=first");
    assert!(!chunk.is_last());

    driver.receive(b"0\r\nX-Checksum: abc\r\n\r\n");
    let Some(Event::Chunk(last)) = driver.poll_event() else { panic!("expected the last chunk") };
    assert!(last.is_last());
    assert_eq!(last.trailers().find("X-Checksum"), Some("abc"));

    driver.send_response(ok(), Bytes::new()).unwrap();
    assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
}

#[test]
fn chunked_response() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET /stream HTTP/1.1\r\n\r\n");
    assert!(matches!(driver.poll_event(), Some(Event::Request { .. })));

    driver.send_chunked_response(ok()).unwrap();
    driver.send_chunk(Bytes::from_static(b"Wiki")).unwrap();
    driver.send_chunk(Bytes::from_static(b"pedia")).unwrap();
    let mut trailers = Headers::new();
    trailers.insert("Expires", "never").unwrap();
    driver.send_last_chunk(LastChunk::new("", trailers)).unwrap();

    let expected = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\nExpires: never\r\n\r\n";
    assert_eq!(output(&mut driver), expected);
    assert!(driver.send_chunk(Bytes::from_static(b"late")).is_err());
}

#[test]
fn expect_continue_accepted() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"PUT /hello HTTP/1.1\r\nContent-Length: 5\r\nExpect: 100-continue\r\n\r\n");

    let Some(Event::ExpectContinue { head }) = driver.poll_event() else { panic!("expected expect-continue") };
    assert!(driver.poll_event().is_none());

    // body bytes that arrive early wait for the answer
    driver.receive(b"hel");
    assert!(driver.poll_event().is_none());

    driver.continue_or_reject(&head).unwrap();
    assert_eq!(output(&mut driver), "HTTP/1.1 100 Continue\r\n\r\n");

    driver.receive(b"lo");
    let Some(Event::Request { body, .. }) = driver.poll_event() else { panic!("expected a request") };
    assert_eq!(&body[..], b"hello");
}

#[test]
fn expect_continue_rejected_when_too_large() {
    let config = ConnectionConfig { parser: ParserConfig { max_body_size: 16, ..ParserConfig::default() }, ..ConnectionConfig::default() };
    let mut driver = ConnectionDriver::new(config);
    driver.receive(b"PUT /hello HTTP/1.1\r\nContent-Length: 100\r\nExpect: 100-continue\r\n\r\n");

    let Some(Event::ExpectContinue { head }) = driver.poll_event() else { panic!("expected expect-continue") };
    driver.continue_or_reject(&head).unwrap();

    assert_eq!(output(&mut driver), "HTTP/1.1 413 Payload Too Large\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    assert!(driver.should_close());
    assert!(events(&mut driver).is_empty());
}

#[test]
fn oversized_body_without_expect() {
    let config = ConnectionConfig { parser: ParserConfig { max_body_size: 4, ..ParserConfig::default() }, ..ConnectionConfig::default() };
    let mut driver = ConnectionDriver::new(config);
    driver.receive(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");

    let events = events(&mut driver);
    assert_eq!(events.len(), 1);
    let Event::Invalid(error) = &events[0] else { panic!("expected invalid") };
    assert!(error.is_oversized());
    assert!(output(&mut driver).starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
}

#[test]
fn folded_and_bare_lf_headers() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET / HTTP/1.1\nX-Long: first\r\n  second\nHost: h\n\n");

    let Some(Event::Request { head, .. }) = driver.poll_event() else { panic!("expected a request") };
    assert_eq!(head.headers().find("x-long"), Some("first second"));
    assert_eq!(head.headers().find("host"), Some("h"));
}

#[test]
fn strict_mode_rejects_folding() {
    let config = ConnectionConfig { parser: ParserConfig { strict_crlf: true, ..ParserConfig::default() }, ..ConnectionConfig::default() };
    let mut driver = ConnectionDriver::new(config);
    driver.receive(b"GET / HTTP/1.1\r\nX-Long: first\r\n  second\r\n\r\n");

    assert!(matches!(driver.poll_event(), Some(Event::Invalid(ParseError::InvalidHeader { .. }))));
    assert!(output(&mut driver).starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(driver.should_close());
}

#[test]
fn duplicate_content_length() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 3\r\n\r\nabc");
    let Some(Event::Request { body, .. }) = driver.poll_event() else { panic!("expected a request") };
    assert_eq!(&body[..], b"abc");

    let mut driver = ConnectionDriver::default();
    driver.receive(b"POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\nabcd");
    assert!(matches!(driver.poll_event(), Some(Event::Invalid(ParseError::InvalidContentLength { .. }))));
    assert!(output(&mut driver).starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[test]
fn too_many_headers() {
    let config = ConnectionConfig { parser: ParserConfig { max_headers: 2, ..ParserConfig::default() }, ..ConnectionConfig::default() };
    let mut driver = ConnectionDriver::new(config);
    driver.receive(b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n");

    assert!(matches!(driver.poll_event(), Some(Event::Invalid(ParseError::TooManyHeaders { .. }))));
    assert!(output(&mut driver).starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
}

#[test]
fn pipelined_requests() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET /a HTTP/1.1\r\n\r\nPOST /b HTTP/1.1\r\nContent-Length: 2\r\n\r\nhiGET /c HTTP/1.1\r\n");

    let uris: Vec<_> = events(&mut driver)
        .into_iter()
        .map(|event| match event {
            Event::Request { head, .. } => head.uri().to_owned(),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(uris, ["/a", "/b"]);

    driver.send_response(ok(), Bytes::from_static(b"a")).unwrap();
    driver.send_response(ok(), Bytes::from_static(b"b")).unwrap();
    assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\naHTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb");
    assert!(!driver.should_close());

    driver.receive(b"\r\n");
    let Some(Event::Request { head, .. }) = driver.poll_event() else { panic!("expected a request") };
    assert_eq!(head.uri(), "/c");
}

#[test]
fn invalid_request_behind_pipelined_one() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\nBad Header: x\r\n\r\n");

    let events = events(&mut driver);
    assert!(matches!(&events[..], [Event::Request { head, .. }, Event::Invalid(_)] if head.uri() == "/a"));
    assert_eq!(output(&mut driver), "");
    assert!(!driver.should_close());

    driver.send_response(ok(), Bytes::from_static(b"a")).unwrap();
    assert_eq!(
        output(&mut driver),
        "HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\naHTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
    );
    assert!(driver.should_close());
}

#[test]
fn invalid_request_behind_chunked_response() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\nContent-Length: x\r\n\r\n");
    assert_eq!(events(&mut driver).len(), 2);

    driver.send_chunked_response(ok()).unwrap();
    driver.send_chunk(Bytes::from_static(b"a")).unwrap();
    assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\n");
    assert!(!driver.should_close());

    driver.send_last_chunk(LastChunk::default()).unwrap();
    assert_eq!(output(&mut driver), "0\r\n\r\nHTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    assert!(driver.should_close());
}

#[test]
fn close_response_drops_queued_error() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET /a HTTP/1.1\r\n\r\n\x01 /b HTTP/1.1\r\n\r\n");
    assert_eq!(events(&mut driver).len(), 2);

    let mut response = ok();
    response.headers_mut().set_close();
    driver.send_response(response, Bytes::new()).unwrap();
    assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    assert!(driver.should_close());
}

#[test]
fn connection_close_request() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\nGET /ignored HTTP/1.1\r\n\r\n");

    assert_eq!(events(&mut driver).len(), 1);
    driver.send_response(ok(), Bytes::new()).unwrap();
    assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    assert!(driver.should_close());
}

#[test]
fn http10_keep_alive() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");

    assert!(matches!(driver.poll_event(), Some(Event::Request { .. })));
    driver.send_response(ok(), Bytes::new()).unwrap();
    assert!(!output(&mut driver).contains("Connection: close"));
    assert!(!driver.should_close());
}

#[test]
fn disconnect_mid_body() {
    let mut driver = ConnectionDriver::default();
    driver.receive(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc");
    assert!(driver.poll_event().is_none());

    assert!(matches!(driver.disconnect(), Event::Disconnected));
    driver.receive(b"defghij");
    assert!(driver.poll_event().is_none());
    assert!(driver.send_response(ok(), Bytes::new()).is_err());
}

#[test]
fn response_read_until_close() {
    let mut decoder = ResponseDecoder::default();
    let mut src = BytesMut::from(&b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\nsome "[..]);

    let Some(Message::Header((head, payload_size))) = decoder.decode(&mut src).unwrap() else { panic!("expected a head") };
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(payload_size, PayloadSize::UntilClose);

    let mut body = Vec::new();
    while let Some(Message::Payload(BodyItem::Data(data))) = decoder.decode(&mut src).unwrap() {
        body.extend_from_slice(&data);
    }
    src.extend_from_slice(b"body");
    while let Some(item) = decoder.decode_eof(&mut src).unwrap() {
        match item {
            Message::Payload(BodyItem::Data(data)) => body.extend_from_slice(&data),
            Message::Payload(BodyItem::Eof) => break,
            other => panic!("unexpected item {other:?}"),
        }
    }
    assert_eq!(body, b"some body");
}
