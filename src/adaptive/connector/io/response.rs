use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};

use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::io::request::ApiMethod;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Payload located inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    /// The response carried no `output` node.
    NoData,
    /// Delimited text directly under `response/output`.
    Flat(String),
    /// Delimited text under `response/output/data`.
    Nested(String),
}

impl ExportPayload {
    /// The delimited text, or `None` when the export had no data.
    pub fn into_text(self) -> Option<String> {
        match self {
            ExportPayload::NoData => None,
            ExportPayload::Flat(text) | ExportPayload::Nested(text) => Some(text),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            ExportPayload::NoData => "no-data",
            ExportPayload::Flat(_) => "flat",
            ExportPayload::Nested(_) => "nested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Output,
    Data,
    Message,
    Other,
}

/// Character content collected for one payload node.
///
/// CDATA sections are kept apart from plain text so that indentation around
/// a section never leaks into the payload.
#[derive(Default)]
struct SlotText {
    text: String,
    cdata: Option<String>,
}

impl SlotText {
    fn push_text(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.text.push_str(text);
        }
    }

    fn push_cdata(&mut self, data: &str) {
        self.cdata.get_or_insert_with(String::new).push_str(data);
    }

    fn into_payload(self) -> String {
        match self.cdata {
            Some(data) => data,
            None => strip_cdata_markers(&self.text).to_string(),
        }
    }
}

#[derive(Default)]
struct Envelope {
    root: Option<String>,
    success: Option<String>,
    output: Option<SlotText>,
    data: Option<SlotText>,
    messages: Vec<String>,
}

impl Envelope {
    fn open(&mut self, path: &[String], element: &BytesStart<'_>) -> Result<Slot> {
        if path.len() == 1 {
            self.root = Some(path[0].clone());
            for attribute in element.attributes() {
                let attribute = attribute.map_err(quick_xml::Error::from)?;
                if attribute.key.as_ref() == b"success" {
                    self.success = Some(attribute.unescape_value()?.into_owned());
                }
            }
        }

        let slot = slot_for(path);
        match slot {
            Slot::Output => {
                self.output.get_or_insert_with(SlotText::default);
            }
            Slot::Data => {
                self.data.get_or_insert_with(SlotText::default);
            }
            Slot::Message => self.messages.push(String::new()),
            Slot::Other => {}
        }
        Ok(slot)
    }

    fn slot_text(&mut self, slot: Slot) -> Option<&mut SlotText> {
        match slot {
            Slot::Output => self.output.as_mut(),
            Slot::Data => self.data.as_mut(),
            Slot::Message | Slot::Other => None,
        }
    }

    fn push_text(&mut self, slot: Slot, text: &str) {
        if slot == Slot::Message {
            if let Some(message) = self.messages.last_mut() {
                message.push_str(text);
            }
        } else if let Some(target) = self.slot_text(slot) {
            target.push_text(text);
        }
    }

    fn push_cdata(&mut self, slot: Slot, data: &str) {
        if slot == Slot::Message {
            if let Some(message) = self.messages.last_mut() {
                message.push_str(data);
            }
        } else if let Some(target) = self.slot_text(slot) {
            target.push_cdata(data);
        }
    }
}

fn slot_for(path: &[String]) -> Slot {
    let names: Vec<&str> = path.iter().map(String::as_str).collect();
    match names.as_slice() {
        ["response", "output"] => Slot::Output,
        ["response", "output", "data"] => Slot::Data,
        ["response", "messages", "message"] => Slot::Message,
        _ => Slot::Other,
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Locates the delimited payload inside an API response.
///
/// A response without `output` yields [`ExportPayload::NoData`]; callers
/// decide whether that is acceptable. A response flagged `success="false"`
/// fails with [`ConnectorError::Api`].
#[instrument(level = "debug", skip_all, fields(%method, bytes = xml.len()))]
pub fn extract_payload(method: ApiMethod, xml: &str) -> Result<ExportPayload> {
    let mut reader = Reader::from_str(xml);
    let mut envelope = Envelope::default();
    let mut path: Vec<String> = Vec::new();
    let mut slots: Vec<Slot> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                path.push(local_name(&element));
                slots.push(envelope.open(&path, &element)?);
            }
            Event::Empty(element) => {
                path.push(local_name(&element));
                envelope.open(&path, &element)?;
                path.pop();
            }
            Event::End(_) => {
                path.pop();
                slots.pop();
            }
            Event::Text(text) => {
                if let Some(slot) = slots.last() {
                    envelope.push_text(*slot, &text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(slot) = slots.last() {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(|err| {
                        ConnectorError::Parse(format!("CDATA section is not UTF-8: {err}"))
                    })?;
                    envelope.push_cdata(*slot, text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(ConnectorError::Parse(format!(
            "{method} response ended inside <{}>",
            path.join("/")
        )));
    }

    match envelope.root.as_deref() {
        Some("response") => {}
        Some(other) => {
            return Err(ConnectorError::Parse(format!(
                "{method} response root is <{other}>, expected <response>"
            )));
        }
        None => {
            return Err(ConnectorError::Parse(format!(
                "{method} response is empty"
            )));
        }
    }

    if envelope.success.as_deref() == Some("false") {
        return Err(ConnectorError::Api {
            method: method.to_string(),
            messages: envelope
                .messages
                .into_iter()
                .map(|message| message.trim().to_string())
                .collect(),
        });
    }

    let payload = match (envelope.output, envelope.data) {
        (None, _) => ExportPayload::NoData,
        (Some(_), Some(data)) => ExportPayload::Nested(data.into_payload()),
        (Some(output), None) => ExportPayload::Flat(output.into_payload()),
    };
    debug!(shape = payload.shape(), "located export payload");
    Ok(payload)
}

/// Extracts the payload of a response that must carry data.
pub fn extract_required_payload(method: ApiMethod, xml: &str) -> Result<String> {
    extract_payload(method, xml)?
        .into_text()
        .ok_or_else(|| ConnectorError::MissingOutput {
            method: method.to_string(),
        })
}

/// Removes a literal `<![CDATA[ ... ]]>` wrapper left in text content.
///
/// Only a complete wrapper around the whole (whitespace-trimmed) text is
/// removed; anything else is returned unchanged.
pub fn strip_cdata_markers(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix(CDATA_OPEN)
        .and_then(|inner| inner.strip_suffix(CDATA_CLOSE))
    {
        Some(inner) => inner,
        None => text,
    }
}
