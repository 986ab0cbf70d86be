// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Codec benchmarks: request encoding and rowset decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xmla_olap_protocol::codec::{self, ROWSET_NS, SOAP_ENV_NS, XMLA_NS};
use xmla_olap_protocol::{RequestType, Restrictions};

fn members_response(rows: usize) -> String {
    let mut body = String::new();
    for i in 0..rows {
        body.push_str(&format!(
            "<row><MEMBER_UNIQUE_NAME>[Customers].[Member {i}]</MEMBER_UNIQUE_NAME>\
             <MEMBER_NAME>Member {i}</MEMBER_NAME><MEMBER_ORDINAL>{i}</MEMBER_ORDINAL>\
             <LEVEL_NUMBER>1</LEVEL_NUMBER></row>"
        ));
    }
    format!(
        "<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\"><SOAP-ENV:Body>\
         <DiscoverResponse xmlns=\"{XMLA_NS}\"><return><root xmlns=\"{ROWSET_NS}\">{body}</root>\
         </return></DiscoverResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
}

fn bench_encode(c: &mut Criterion) {
    let names: Vec<String> = (0..200).map(|i| format!("[Customers].[Member {i}]")).collect();
    let restrictions = Restrictions::new()
        .with("CATALOG_NAME", "FoodMart")
        .with("CUBE_NAME", "Sales")
        .with_many("MEMBER_UNIQUE_NAME", names);
    let properties = codec::discover_properties(Some("Provider=Mondrian"), Some("FoodMart"), None);

    c.bench_function("encode_discover_200_names", |b| {
        b.iter(|| {
            codec::encode_discover(
                black_box(RequestType::MdschemaMembers),
                black_box(&restrictions),
                black_box(&properties),
            )
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let response = members_response(1_000);
    c.bench_function("decode_discover_1000_rows", |b| {
        b.iter(|| codec::decode_discover(black_box(response.as_bytes()), "bench"))
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
