//! Builds the XML envelopes posted to the Adaptive API.
//!
//! Every call shares the same shape:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <call method="exportData" callerName="...">
//!     <credentials login="..." password="..."/>
//!     <!-- method specific elements -->
//! </call>
//! ```

use std::fmt;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::adaptive::connector::config::Credentials;
use crate::adaptive::connector::error::Result;

/// API operations issued by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    ExportData,
    ExportConfigurableModelData,
}

impl ApiMethod {
    /// Method name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::ExportData => "exportData",
            ApiMethod::ExportConfigurableModelData => "exportConfigurableModelData",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned XML element used for method parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Appends an attribute, keeping insertion order.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Appends a child element.
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Serialises a complete `call` document.
///
/// `credentials` is always the first child of `call`; `method_params` follow
/// in the order given.
pub fn build_request(
    method: ApiMethod,
    credentials: &Credentials,
    caller_name: &str,
    method_params: &[XmlElement],
) -> Result<Vec<u8>> {
    let call = XmlElement::new("call")
        .attr("method", method.as_str())
        .attr("callerName", caller_name);
    let credentials = XmlElement::new("credentials")
        .attr("login", credentials.login.as_str())
        .attr("password", credentials.password.as_str());
    let call = method_params
        .iter()
        .cloned()
        .fold(call.child(credentials), XmlElement::child);

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    call.write_to(&mut writer)?;
    Ok(writer.into_inner())
}

/// Parameters of `exportData`: the version, output format flags, and the
/// time rollup rule.
pub fn export_data_params(version: &str) -> Vec<XmlElement> {
    vec![
        XmlElement::new("version").attr("name", version),
        XmlElement::new("format")
            .attr("useInternalCodes", "true")
            .attr("includeUnmappedItems", "false"),
        XmlElement::new("rules").attr("timeRollups", "true"),
    ]
}

/// Parameters of `exportConfigurableModelData` for a single level of the
/// `Personnel` modeled sheet.
pub fn export_configurable_model_data_params(
    version: &str,
    time_span: (&str, &str),
    level_name: &str,
) -> Vec<XmlElement> {
    let (start, end) = time_span;
    vec![
        XmlElement::new("version").attr("name", version),
        XmlElement::new("job")
            .attr("jobNumber", "0")
            .attr("pageNumber", "1")
            .attr("pageSize", "200"),
        XmlElement::new("modeled-sheet")
            .attr("name", "Personnel")
            .attr("isGlobal", "false")
            .attr("includeAllColumns", "true"),
        XmlElement::new("filters")
            .child(
                XmlElement::new("timeSpan")
                    .attr("start", start)
                    .attr("end", end),
            )
            .child(XmlElement::new("levels").child(XmlElement::new("level").attr("name", level_name))),
    ]
}
