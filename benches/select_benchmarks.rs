#![allow(missing_docs)]
//! Benchmarks for statement compilation and record selection.
//!
//! Fixtures are generated in memory so the suite needs no data files.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use marcflow::formats::FormatReaderExt;
use marcflow::{AlephReader, CompiledQuery, MarcReader, MarcXmlReader};

const LEADER: &str = "00000nam a2200000 a 4500";

fn marc_record(id: usize) -> String {
    let fields = [
        ("001", format!("rec-{id}")),
        ("245", format!("10\u{1F}aTitle number {id}\u{1F}cAn author")),
        ("500", "  \u{1F}aA general note".to_string()),
        ("650", " 0\u{1F}aSubject\u{1F}vFiction".to_string()),
    ];
    let mut directory = String::new();
    let mut data = String::new();
    for (tag, body) in &fields {
        directory.push_str(&format!("{tag}{:04}{:05}", body.len() + 1, data.len()));
        data.push_str(body);
        data.push('\u{1E}');
    }
    format!("{LEADER}{directory}\u{1E}{data}\u{1D}")
}

fn marc_fixture(count: usize) -> Vec<u8> {
    (0..count).map(marc_record).collect::<String>().into_bytes()
}

fn marcxml_fixture(count: usize) -> Vec<u8> {
    let mut xml = String::from(r#"<collection xmlns="http://www.loc.gov/MARC21/slim">"#);
    for id in 0..count {
        xml.push_str(&format!(
            r#"<record><leader>{LEADER}</leader><controlfield tag="001">rec-{id}</controlfield><datafield tag="245" ind1="1" ind2="0"><subfield code="a">Title number {id}</subfield><subfield code="c">An author</subfield></datafield><datafield tag="650" ind1=" " ind2="0"><subfield code="a">Subject</subfield><subfield code="v">Fiction</subfield></datafield></record>"#
        ));
    }
    xml.push_str("</collection>");
    xml.into_bytes()
}

fn aleph_fixture(count: usize) -> Vec<u8> {
    let mut out = String::new();
    for id in 0..count {
        let asn = format!("{id:09}");
        out.push_str(&format!("{asn} 001   L rec-{id}\n"));
        out.push_str(&format!("{asn} 24510 L $$aTitle number {id}$$cAn author\n"));
        out.push_str(&format!("{asn} 650 0 L $$aSubject$$vFiction\n"));
    }
    out.into_bytes()
}

fn benchmark_compile(c: &mut Criterion) {
    c.bench_function("compile_statement", |b| {
        b.iter(|| CompiledQuery::compile(black_box("001 245a 6__a (650_0vFic | !500___) & 245__aTitle")));
    });
}

fn benchmark_marc_1k(c: &mut Criterion) {
    let fixture = marc_fixture(1_000);
    let query = CompiledQuery::compile("001 245a 650_0vFic").unwrap();

    c.bench_function("select_marc_1k_records", |b| {
        b.iter(|| {
            let mut reader = MarcReader::new(black_box(&fixture[..]), &query);
            reader.results().flatten().count()
        });
    });
}

fn benchmark_marc_fast_reject(c: &mut Criterion) {
    let fixture = marc_fixture(1_000);
    let query = CompiledQuery::compile("999a").unwrap();

    c.bench_function("select_marc_1k_records_no_match", |b| {
        b.iter(|| {
            let mut reader = MarcReader::new(black_box(&fixture[..]), &query);
            reader.results().flatten().count()
        });
    });
}

fn benchmark_marcxml_1k(c: &mut Criterion) {
    let fixture = marcxml_fixture(1_000);
    let query = CompiledQuery::compile("001 245a 650_0vFic").unwrap();

    c.bench_function("select_marcxml_1k_records", |b| {
        b.iter(|| {
            let mut reader = MarcXmlReader::new(black_box(&fixture[..]), &query);
            reader.results().flatten().count()
        });
    });
}

fn benchmark_aleph_1k(c: &mut Criterion) {
    let fixture = aleph_fixture(1_000);
    let query = CompiledQuery::compile("001 245a 650_0vFic").unwrap();

    c.bench_function("select_aleph_1k_records", |b| {
        b.iter(|| {
            let mut reader = AlephReader::new(black_box(&fixture[..]), &query);
            reader.results().flatten().count()
        });
    });
}

criterion_group!(
    benches,
    benchmark_compile,
    benchmark_marc_1k,
    benchmark_marc_fast_reject,
    benchmark_marcxml_1k,
    benchmark_aleph_1k
);
criterion_main!(benches);
