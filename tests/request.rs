use adaptive_connector::config::Credentials;
use adaptive_connector::io::request::{
    ApiMethod, XmlElement, build_request, export_configurable_model_data_params,
    export_data_params,
};
use quick_xml::Reader;
use quick_xml::events::Event;

/// (depth, element name, attributes) for every element, in document order.
fn elements(document: &[u8]) -> Vec<(usize, String, Vec<(String, String)>)> {
    let text = std::str::from_utf8(document).expect("request is UTF-8");
    let mut reader = Reader::from_str(text);
    let mut depth = 0;
    let mut found = Vec::new();
    loop {
        let (element, opens) = match reader.read_event().expect("request is well-formed") {
            Event::Start(element) => (element, true),
            Event::Empty(element) => (element, false),
            Event::End(_) => {
                depth -= 1;
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let attributes = element
            .attributes()
            .map(|attribute| {
                let attribute = attribute.expect("valid attribute");
                (
                    String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                    attribute.unescape_value().expect("escaped value").into_owned(),
                )
            })
            .collect();
        found.push((depth, name, attributes));
        if opens {
            depth += 1;
        }
    }
    found
}

fn credentials() -> Credentials {
    Credentials {
        login: "loader@example.com".to_string(),
        password: "p&ss<word>".to_string(),
    }
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn credentials_come_first_and_params_keep_their_order() {
    let params = vec![
        XmlElement::new("zeta"),
        XmlElement::new("alpha").attr("n", "1"),
        XmlElement::new("mid"),
    ];
    let document = build_request(ApiMethod::ExportData, &credentials(), "tests", &params)
        .expect("request built");

    let found = elements(&document);
    let top_level: Vec<&str> = found
        .iter()
        .filter(|(depth, _, _)| *depth == 1)
        .map(|(_, name, _)| name.as_str())
        .collect();
    assert_eq!(top_level, ["credentials", "zeta", "alpha", "mid"]);

    let (depth, name, attributes) = &found[0];
    assert_eq!(*depth, 0);
    assert_eq!(name, "call");
    assert_eq!(
        attributes,
        &pairs(&[("method", "exportData"), ("callerName", "tests")])
    );
}

#[test]
fn request_without_params_carries_only_credentials() {
    let document = build_request(
        ApiMethod::ExportConfigurableModelData,
        &credentials(),
        "tests",
        &[],
    )
    .expect("request built");

    let found = elements(&document);
    assert_eq!(found.len(), 2);
    assert_eq!(found[1].1, "credentials");
    assert_eq!(
        found[1].2,
        pairs(&[("login", "loader@example.com"), ("password", "p&ss<word>")])
    );
}

#[test]
fn request_starts_with_declaration_and_escapes_attributes() {
    let document =
        build_request(ApiMethod::ExportData, &credentials(), "tests", &[]).expect("request built");
    let text = String::from_utf8(document).expect("request is UTF-8");

    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(text.contains("p&amp;ss&lt;word&gt;"));
    assert!(!text.contains("p&ss"));
}

#[test]
fn export_data_params_request_internal_codes_and_rollups() {
    let document = build_request(
        ApiMethod::ExportData,
        &credentials(),
        "tests",
        &export_data_params("FY22 Budget"),
    )
    .expect("request built");

    let found = elements(&document);
    let names: Vec<&str> = found.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(names, ["call", "credentials", "version", "format", "rules"]);
    assert_eq!(found[2].2, pairs(&[("name", "FY22 Budget")]));
    assert_eq!(
        found[3].2,
        pairs(&[("useInternalCodes", "true"), ("includeUnmappedItems", "false")])
    );
    assert_eq!(found[4].2, pairs(&[("timeRollups", "true")]));
}

#[test]
fn configurable_model_params_filter_a_single_level() {
    let params = export_configurable_model_data_params("FY22 Budget", ("07/2021", "06/2022"), "HQ");
    let document = build_request(
        ApiMethod::ExportConfigurableModelData,
        &credentials(),
        "tests",
        &params,
    )
    .expect("request built");

    let found = elements(&document);
    let outline: Vec<(usize, &str)> = found
        .iter()
        .map(|(depth, name, _)| (*depth, name.as_str()))
        .collect();
    assert_eq!(
        outline,
        [
            (0, "call"),
            (1, "credentials"),
            (1, "version"),
            (1, "job"),
            (1, "modeled-sheet"),
            (1, "filters"),
            (2, "timeSpan"),
            (2, "levels"),
            (3, "level"),
        ]
    );
    assert_eq!(
        found[3].2,
        pairs(&[("jobNumber", "0"), ("pageNumber", "1"), ("pageSize", "200")])
    );
    assert_eq!(
        found[4].2,
        pairs(&[
            ("name", "Personnel"),
            ("isGlobal", "false"),
            ("includeAllColumns", "true"),
        ])
    );
    assert_eq!(found[6].2, pairs(&[("start", "07/2021"), ("end", "06/2022")]));
    assert_eq!(found[8].2, pairs(&[("name", "HQ")]));
}
