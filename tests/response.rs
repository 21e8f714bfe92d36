mod common;

use std::collections::HashSet;

use adaptive_connector::ConnectorError;
use adaptive_connector::io::request::ApiMethod;
use adaptive_connector::io::response::{
    ExportPayload, extract_payload, extract_required_payload, strip_cdata_markers,
};
use adaptive_connector::sync::parse_accounts_export;
use common::{ACCOUNTS_CSV, empty_response, flat_response, nested_response};

const CSV: &str = "AccountName,AccountCode,LevelName,2021\nRevenue,4000,HQ,200\n";

#[test]
fn flat_payload_is_read_from_cdata_verbatim() {
    let payload = extract_payload(ApiMethod::ExportData, &flat_response(CSV)).expect("parsed");
    assert_eq!(payload, ExportPayload::Flat(CSV.to_string()));
}

#[test]
fn flat_payload_accepts_escaped_text() {
    let xml = "<response success=\"true\"><output>Name,Value\nR&amp;D,1\n</output></response>";
    let payload = extract_payload(ApiMethod::ExportData, xml).expect("parsed");
    assert_eq!(payload, ExportPayload::Flat("Name,Value\nR&D,1\n".to_string()));
}

#[test]
fn literal_cdata_wrapper_in_text_is_removed() {
    let xml = "<response success=\"true\"><output>&lt;![CDATA[a,b\n1,2\n]]&gt;</output></response>";
    let payload = extract_payload(ApiMethod::ExportData, xml).expect("parsed");
    assert_eq!(payload, ExportPayload::Flat("a,b\n1,2\n".to_string()));
}

#[test]
fn nested_payload_is_read_from_data_node() {
    let payload = extract_payload(
        ApiMethod::ExportConfigurableModelData,
        &nested_response(CSV),
    )
    .expect("parsed");
    assert_eq!(payload, ExportPayload::Nested(CSV.to_string()));
}

#[test]
fn indentation_around_flat_cdata_is_ignored() {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<response success=\"true\">\n  <output>\n    <![CDATA[{CSV}]]>\n  </output>\n</response>\n"
    );
    let payload = extract_payload(ApiMethod::ExportData, &xml).expect("parsed");
    assert_eq!(payload, ExportPayload::Flat(CSV.to_string()));
}

#[test]
fn indentation_around_nested_cdata_is_ignored() {
    let xml = format!(
        "<response success=\"true\">\n  <output>\n    <data>\n      <![CDATA[{CSV}]]>\n    </data>\n  </output>\n</response>"
    );
    let payload =
        extract_payload(ApiMethod::ExportConfigurableModelData, &xml).expect("parsed");
    assert_eq!(payload, ExportPayload::Nested(CSV.to_string()));
}

#[test]
fn indented_accounts_response_loads_like_a_compact_one() {
    let indented = format!(
        "<response success=\"true\">\n  <output>\n    <![CDATA[{ACCOUNTS_CSV}]]>\n  </output>\n</response>"
    );
    let allowed: HashSet<String> = ["HQ".to_string()].into_iter().collect();

    let from_indented =
        parse_accounts_export(&indented, &allowed, 2021, 2022).expect("indented parsed");
    let from_compact = parse_accounts_export(&flat_response(ACCOUNTS_CSV), &allowed, 2021, 2022)
        .expect("compact parsed");

    assert_eq!(from_indented.len(), 3);
    assert_eq!(from_indented, from_compact);
}

#[test]
fn whitespace_only_output_is_an_empty_payload() {
    let xml = "<response success=\"true\">\n  <output>\n  </output>\n</response>";
    let payload = extract_payload(ApiMethod::ExportData, xml).expect("parsed");
    assert_eq!(payload, ExportPayload::Flat(String::new()));
}

#[test]
fn missing_output_means_no_data() {
    let payload =
        extract_payload(ApiMethod::ExportConfigurableModelData, &empty_response()).expect("parsed");
    assert_eq!(payload, ExportPayload::NoData);
    assert_eq!(payload.into_text(), None);
}

#[test]
fn accounts_response_without_output_fails_loudly() {
    let err = extract_required_payload(ApiMethod::ExportData, &empty_response())
        .expect_err("output is required");
    assert!(matches!(err, ConnectorError::MissingOutput { ref method } if method == "exportData"));
}

#[test]
fn unsuccessful_response_surfaces_api_messages() {
    let xml = "<response success=\"false\"><messages>\
               <message key=\"auth\" type=\"ERROR\">Invalid credentials</message>\
               </messages></response>";
    let err = extract_payload(ApiMethod::ExportData, xml).expect_err("API failure");
    match err {
        ConnectorError::Api { method, messages } => {
            assert_eq!(method, "exportData");
            assert_eq!(messages, vec!["Invalid credentials".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_xml_is_a_parse_failure() {
    let err = extract_payload(ApiMethod::ExportData, "<response><output>a,b</response>")
        .expect_err("mismatched tags");
    assert!(matches!(err, ConnectorError::Xml(_)), "unexpected error: {err}");
}

#[test]
fn truncated_document_is_a_parse_failure() {
    let err = extract_payload(ApiMethod::ExportData, "<response><output>a,b")
        .expect_err("unterminated document");
    assert!(
        matches!(err, ConnectorError::Parse(_) | ConnectorError::Xml(_)),
        "unexpected error: {err}"
    );
}

#[test]
fn unexpected_root_is_rejected() {
    let err = extract_payload(ApiMethod::ExportData, "<call method=\"exportData\"/>")
        .expect_err("not a response");
    assert!(matches!(err, ConnectorError::Parse(_)), "unexpected error: {err}");
}

#[test]
fn strip_cdata_markers_only_removes_a_complete_wrapper() {
    assert_eq!(strip_cdata_markers("<![CDATA[a,b]]>"), "a,b");
    assert_eq!(strip_cdata_markers("\n  <![CDATA[a,b]]>\n"), "a,b");
    assert_eq!(strip_cdata_markers("[CDATA,A]"), "[CDATA,A]");
    assert_eq!(strip_cdata_markers("<![CDATA[a,b"), "<![CDATA[a,b");
    assert_eq!(strip_cdata_markers("Data,]]"), "Data,]]");
}
