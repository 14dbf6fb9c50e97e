use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use http::StatusCode;
use strand_http::codec::body::ChunkReader;
use strand_http::codec::{RequestDecoder, ResponseEncoder};
use strand_http::config::ParserConfig;
use strand_http::connection::{ConnectionDriver, Event};
use strand_http::protocol::{Message, PayloadItem, PayloadSize, ResponseHead};
use tokio_util::codec::{Decoder, Encoder};

const CURL_REQUEST: &[u8] = b"GET /hello HTTP/1.1\r\nHost: 127.0.0.1:8080\r\nUser-Agent: curl/7.79.1\r\nAccept: */*\r\n\r\n";

fn chunked_body() -> Vec<u8> {
    let mut body = Vec::new();
    for _ in 0..16 {
        body.extend_from_slice(b"400; name=value\r\n");
        body.extend_from_slice(&[b'x'; 0x400]);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"0\r\nX-Checksum: 0\r\n\r\n");
    body
}

fn bench_request_decoder(c: &mut Criterion) {
    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::default();
            let mut bytes = BytesMut::from(CURL_REQUEST);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    c.bench_function("decode_request_byte_by_byte", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::default();
            for byte in CURL_REQUEST {
                let mut bytes = BytesMut::from(&[*byte][..]);
                black_box(decoder.decode(&mut bytes).unwrap());
            }
        });
    });
}

fn bench_chunk_reader(c: &mut Criterion) {
    let body = chunked_body();

    c.bench_function("read_chunked_body", |b| {
        b.iter(|| {
            let mut reader = ChunkReader::new(ParserConfig::default());
            let mut bytes = BytesMut::from(&body[..]);
            while let Some(chunk) = reader.decode(&mut bytes).unwrap() {
                black_box(chunk);
            }
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            let head = ResponseHead::response(StatusCode::OK);
            encoder.encode(Message::<_, PayloadItem>::Header((head, PayloadSize::Length(12))), &mut bytes).unwrap();
            encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"Hello World!"))), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_connection_driver(c: &mut Criterion) {
    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let mut driver = ConnectionDriver::default();
            driver.receive(CURL_REQUEST);
            while let Some(event) = driver.poll_event() {
                if let Event::Request { .. } = event {
                    driver.send_response(ResponseHead::response(StatusCode::OK), Bytes::from_static(b"Hello World!")).unwrap();
                }
            }
            black_box(driver.take_output());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_chunk_reader, bench_response_encoder, bench_connection_driver);
criterion_main!(benches);
