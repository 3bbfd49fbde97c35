//! SOAP 1.1 envelope for the portal's fallback protocol

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use super::types::TransportError;

pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Build the request envelope for `method` carrying one plot code.
pub fn build_envelope(namespace: &str, method: &str, code: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
    <soap:Body>
        <{method} xmlns="{namespace}">
            <plcd>{code}</plcd>
        </{method}>
    </soap:Body>
</soap:Envelope>"#,
        method = method,
        namespace = escape(namespace),
        code = escape(code),
    )
}

/// Value of the `SOAPAction` header for `method`.
pub fn soap_action(namespace: &str, method: &str) -> String {
    format!("{}/{}", namespace.trim_end_matches('/'), method)
}

/// Extract the text of `<{method}Result>` from a SOAP response.
///
/// A self-closing or empty result element yields an empty string.
pub fn extract_result(xml: &str, method: &str) -> Result<String, TransportError> {
    let target = format!("{}Result", method);
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == target.as_bytes() => inside = true,
            Ok(Event::Empty(e)) if e.local_name().as_ref() == target.as_bytes() => {
                return Ok(String::new());
            }
            Ok(Event::Text(t)) if inside => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| TransportError::Parse(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(c)) if inside => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(e)) if inside && e.local_name().as_ref() == target.as_bytes() => {
                return Ok(text.trim().to_string());
            }
            Ok(Event::Eof) => return Err(TransportError::MissingSoapResult(target)),
            Ok(_) => {}
            Err(e) => return Err(TransportError::Parse(e.to_string())),
        }
    }
}
