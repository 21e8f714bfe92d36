#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use adaptive_connector::Result;
use adaptive_connector::config::Config;
use adaptive_connector::io::transport::{ApiTransport, HttpResponse};
use adaptive_connector::model::{Cell, Table};

/// Transport that replays canned responses in order and keeps every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    pub requests: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses.borrow_mut().push_back(HttpResponse {
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ApiTransport for ScriptedTransport {
    fn post(&self, _url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        self.requests
            .borrow_mut()
            .push(String::from_utf8(body).expect("request is UTF-8"));
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .expect("a scripted response for every request"))
    }
}

pub fn test_config() -> Config {
    test_config_with(&[])
}

pub fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> = [
        ("API_URL", "https://api.example.com/api/v38"),
        ("API_USER", "loader@example.com"),
        ("API_PWD", "secret"),
        ("CALLER_NAME", "adaptive-connector-tests"),
        ("VERSION", "FY22 Budget"),
        ("START_YEAR", "2021"),
        ("END_YEAR", "2022"),
        ("PERSONNEL_START", "07/2021"),
        ("PERSONNEL_END", "06/2022"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| env.get(key).cloned()).expect("test configuration is valid")
}

/// Builds a table from string literals; empty strings become nulls.
pub fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table {
        columns: columns.iter().map(|column| column.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|field| Cell::from_field(field)).collect())
            .collect(),
    }
}

/// Levels configuration table with account and personnel export flags.
pub fn levels_table() -> Table {
    table(
        &["LevelName", "Export", "ExportPersonnel"],
        &[
            &["HQ", "1", "1"],
            &["Regional", "0", "1"],
            &["Academy", "1", "0"],
        ],
    )
}

pub fn flat_response(csv: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<response success=\"true\"><output><![CDATA[{csv}]]></output></response>"
    )
}

pub fn nested_response(csv: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<response success=\"true\"><output><data><![CDATA[{csv}]]></data></output></response>"
    )
}

pub fn empty_response() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<response success=\"true\"></response>".to_string()
}

pub const ACCOUNTS_CSV: &str = "Account Name,Account Code,Level Name,Jan-2021,Q1-2021,2020,2021,2022\n\
Revenue,4000,HQ,10,30,100,200,300\n\
Revenue,4000,Regional,5,15,50,60,70\n\
Salaries,5000,HQ,1,3,N/A,N/A,12.5\n\
Supplies,6000,Academy,,,7,8,9\n";
