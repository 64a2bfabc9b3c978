use criterion::{criterion_group, criterion_main, Criterion};
use sms_gateway::cancel::CancelToken;
use sms_gateway::command::{message_sequence, validate_body, AtCommand, CommandChannel};
use sms_gateway::port::MockSerialPort;
use std::hint::black_box;
use std::time::Duration;

pub fn bench_frame_building(c: &mut Criterion) {
    let body = "Your verification code is 482910.";
    c.bench_function("build_submit_frame", |b| {
        b.iter(|| {
            let command =
                AtCommand::submit(black_box("09297700500"), black_box(body), Duration::ZERO)
                    .expect("valid frame");
            black_box(command);
        })
    });
}

pub fn bench_body_validation(c: &mut Criterion) {
    let body = "x".repeat(160);
    c.bench_function("validate_max_length_body", |b| {
        b.iter(|| validate_body(black_box(&body)).expect("printable body"))
    });
}

pub fn bench_sequence_through_mock(c: &mut Criterion) {
    let commands = message_sequence(
        "09297700500",
        "Your verification code is 482910.",
        Duration::ZERO,
    )
    .expect("valid sequence");
    let cancel = CancelToken::new();

    c.bench_function("run_sequence_mock_port", |b| {
        b.iter(|| {
            let mut port = MockSerialPort::new("BENCH0");
            CommandChannel::new(&mut port, &cancel)
                .run(black_box(&commands))
                .expect("mock port never fails");
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_frame_building, bench_body_validation, bench_sequence_through_mock
}
criterion_main!(benches);
