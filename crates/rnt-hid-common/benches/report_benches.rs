use criterion::{Criterion, criterion_group, criterion_main};
use rnt_hid_common::{ReportBuilder, ReportParser};
use std::hint::black_box;

fn bench_pack_block_io_frame(c: &mut Criterion) {
    c.bench_function("pack_63_byte_frame", |b| {
        b.iter(|| {
            let mut builder = ReportBuilder::with_padding(63, 0xFF);
            for chn in 0u8..4 {
                if builder.write_bytes(&[chn, 1, 4, 0x01]).is_err() {
                    break;
                }
            }
            black_box(builder.into_padded())
        })
    });
}

fn bench_walk_reply(c: &mut Criterion) {
    let reply = [0x04u8; 63];
    c.bench_function("walk_63_byte_reply", |b| {
        b.iter(|| {
            let mut parser = ReportParser::new(black_box(&reply));
            let mut total = 0usize;
            while let Ok(len) = parser.read_u8() {
                match parser.read_bytes(usize::from(len & 0x3F)) {
                    Ok(bytes) => total += bytes.len(),
                    Err(_) => break,
                }
            }
            black_box(total)
        })
    });
}

criterion_group!(benches, bench_pack_block_io_frame, bench_walk_reply);
criterion_main!(benches);
