use booking_core::xml::{flat_record_from_str, library_tree_from_str, parsed_node_from_str};
use booking_core::ProjectedBooking;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const NESTED_SAMPLE: &str = include_str!("../samples/bookings/booking_173903.xml");
const FLAT_SAMPLE: &str = include_str!("../samples/bookings/173903.xml");

// Repeats the guest block so the converters see documents of growing size
fn reservation_with_guests(guests: usize) -> String {
    let mut xml = String::from("<reservation><confirmation_no>173903</confirmation_no>");
    for i in 0..guests {
        xml.push_str(&format!(
            "<guest type=\"g{}\"><first_name>Guest</first_name><last_name>No{}</last_name></guest>",
            i, i
        ));
    }
    xml.push_str("</reservation>");
    xml
}

pub fn converter_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("booking_converters");

    group.bench_function("library_sample", |b| {
        b.iter(|| library_tree_from_str(black_box(NESTED_SAMPLE)))
    });
    group.bench_function("dom_sample", |b| {
        b.iter(|| parsed_node_from_str(black_box(NESTED_SAMPLE)))
    });
    group.bench_function("flat_sample", |b| {
        b.iter(|| ProjectedBooking::from_flat(&flat_record_from_str(black_box(FLAT_SAMPLE))))
    });

    for guests in [10, 100, 1000].iter() {
        let xml = reservation_with_guests(*guests);
        group.bench_with_input(BenchmarkId::new("library", guests), &xml, |b, xml| {
            b.iter(|| library_tree_from_str(black_box(xml)))
        });
        group.bench_with_input(BenchmarkId::new("dom", guests), &xml, |b, xml| {
            b.iter(|| parsed_node_from_str(black_box(xml)))
        });
    }

    group.finish();
}

criterion_group!(benches, converter_benchmark);
criterion_main!(benches);
