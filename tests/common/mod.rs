//! Common test helpers and fixtures shared across the test suite.

#![allow(dead_code)]

/// Field terminator (end of directory and of each field).
pub const FIELD_TERMINATOR: char = '\u{1E}';
/// Subfield delimiter.
pub const SUBFIELD_DELIMITER: char = '\u{1F}';
/// Record terminator.
pub const RECORD_TERMINATOR: char = '\u{1D}';

/// A typical book leader.
pub const BOOK_LEADER: &str = "00000nam a2200000 a 4500";

/// Assemble one binary MARC record from `(tag, body)` pairs.
///
/// Bodies exclude the field terminator. Directory entries are written in the
/// order given, with start positions following the data order.
pub fn marc_record(leader: &str, fields: &[(&str, &str)]) -> String {
    let mut directory = String::new();
    let mut data = String::new();
    for (tag, body) in fields {
        let length = body.len() + 1;
        directory.push_str(&format!("{tag}{length:04}{:05}", data.len()));
        data.push_str(body);
        data.push(FIELD_TERMINATOR);
    }
    format!("{leader}{directory}{FIELD_TERMINATOR}{data}{RECORD_TERMINATOR}")
}

/// A data field body: indicators followed by `(code, value)` subfields.
pub fn data_field(indicators: &str, subfields: &[(char, &str)]) -> String {
    let mut body = indicators.to_string();
    for (code, value) in subfields {
        body.push(SUBFIELD_DELIMITER);
        body.push(*code);
        body.push_str(value);
    }
    body
}

/// A small catalog of three binary records.
pub fn sample_marc() -> String {
    let mut out = String::new();
    out.push_str(&marc_record(
        BOOK_LEADER,
        &[
            ("001", "rec-1"),
            ("100", &data_field("1 ", &[('a', "Austen, Jane")])),
            (
                "245",
                &data_field("10", &[('a', "Pride and prejudice"), ('c', "Jane Austen")]),
            ),
            ("500", &data_field("  ", &[('a', "A category of novels")])),
            ("650", &data_field(" 0", &[('a', "Courtship"), ('v', "Fiction")])),
            ("650", &data_field(" 0", &[('a', "Courtship")])),
        ],
    ));
    out.push_str(&marc_record(
        BOOK_LEADER,
        &[
            ("001", "rec-2"),
            ("245", &data_field("00", &[('a', "Dog days")])),
            ("500", &data_field("  ", &[('a', "dog")])),
        ],
    ));
    out.push_str(&marc_record(
        BOOK_LEADER,
        &[
            ("001", "rec-3"),
            ("100", &data_field("1 ", &[('a', "Someone"), ('e', "yes")])),
            ("245", &data_field("10", &[('a', "Third")])),
        ],
    ));
    out
}

/// The catalog of [`sample_marc`] as a MARCXML collection.
pub const SAMPLE_MARCXML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <leader>00000nam a2200000 a 4500</leader>
    <controlfield tag="001">rec-1</controlfield>
    <datafield tag="100" ind1="1" ind2=" ">
      <subfield code="a">Austen, Jane</subfield>
    </datafield>
    <datafield tag="245" ind1="1" ind2="0">
      <subfield code="a">Pride and prejudice</subfield>
      <subfield code="c">Jane Austen</subfield>
    </datafield>
    <datafield tag="500" ind1=" " ind2=" ">
      <subfield code="a">A category of novels</subfield>
    </datafield>
    <datafield tag="650" ind1=" " ind2="0">
      <subfield code="a">Courtship</subfield>
      <subfield code="v">Fiction</subfield>
    </datafield>
    <datafield tag="650" ind1=" " ind2="0">
      <subfield code="a">Courtship</subfield>
    </datafield>
  </record>
  <record>
    <leader>00000nam a2200000 a 4500</leader>
    <controlfield tag="001">rec-2</controlfield>
    <datafield tag="245" ind1="0" ind2="0">
      <subfield code="a">Dog days</subfield>
    </datafield>
    <datafield tag="500" ind1=" " ind2=" ">
      <subfield code="a">dog</subfield>
    </datafield>
  </record>
  <record>
    <leader>00000nam a2200000 a 4500</leader>
    <controlfield tag="001">rec-3</controlfield>
    <datafield tag="100" ind1="1" ind2=" ">
      <subfield code="a">Someone</subfield>
      <subfield code="e">yes</subfield>
    </datafield>
    <datafield tag="245" ind1="1" ind2="0">
      <subfield code="a">Third</subfield>
    </datafield>
  </record>
</collection>
"#;

/// One Aleph sequential line.
pub fn aleph_line(asn: &str, tag: &str, indicators: &str, payload: &str) -> String {
    format!("{asn} {tag}{indicators} L {payload}\n")
}

/// The catalog of [`sample_marc`] as Aleph sequential lines.
pub fn sample_aleph() -> String {
    [
        aleph_line("000000001", "LDR", "  ", BOOK_LEADER),
        aleph_line("000000001", "001", "  ", "rec-1"),
        aleph_line("000000001", "100", "1 ", "$$aAusten, Jane"),
        aleph_line("000000001", "245", "10", "$$aPride and prejudice$$cJane Austen"),
        aleph_line("000000001", "500", "  ", "$$aA category of novels"),
        aleph_line("000000001", "650", " 0", "$$aCourtship$$vFiction"),
        aleph_line("000000001", "650", " 0", "$$aCourtship"),
        aleph_line("000000002", "LDR", "  ", BOOK_LEADER),
        aleph_line("000000002", "001", "  ", "rec-2"),
        aleph_line("000000002", "245", "00", "$$aDog days"),
        aleph_line("000000002", "500", "  ", "$$adog"),
        aleph_line("000000003", "LDR", "  ", BOOK_LEADER),
        aleph_line("000000003", "001", "  ", "rec-3"),
        aleph_line("000000003", "100", "1 ", "$$aSomeone$$eyes"),
        aleph_line("000000003", "245", "10", "$$aThird"),
    ]
    .concat()
}

/// Route library `tracing` events to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Owned strings, for comparing against result values.
pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
