//! Minimal XML helpers for the SOAP login exchange.

use quick_xml::Reader;
use quick_xml::events::Event;

/// Extract the text content of the first `<tag>…</tag>` element in `xml`.
///
/// Tag names match exactly as written, prefix included (`sf:exceptionMessage`
/// matches only that qualified name). Returns `None` for an absent tag or
/// unparseable input — the login paths treat both as "field not present".
#[must_use]
pub fn element_value(xml: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    let mut value = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == tag.as_bytes() => {
                inside = true;
                value.clear();
            }
            Ok(Event::End(e)) if inside && e.name().as_ref() == tag.as_bytes() => {
                return Some(value);
            }
            Ok(Event::Text(t)) if inside => {
                value.push_str(t.unescape().ok()?.as_ref());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Escape a value for embedding in element content.
#[must_use]
pub fn escape(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_plain_tag() {
        let xml = "<result><sessionId>00D!abc</sessionId></result>";
        assert_eq!(element_value(xml, "sessionId").as_deref(), Some("00D!abc"));
    }

    #[test]
    fn extracts_namespaced_tag() {
        let xml = r#"<soapenv:Envelope><soapenv:Body><soapenv:Fault>
            <faultstring>INVALID_LOGIN</faultstring>
            <detail><sf:LoginFault><sf:exceptionMessage>Invalid username, password, security token; or user locked out.</sf:exceptionMessage></sf:LoginFault></detail>
            </soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;
        assert_eq!(
            element_value(xml, "sf:exceptionMessage").as_deref(),
            Some("Invalid username, password, security token; or user locked out.")
        );
    }

    #[test]
    fn absent_tag_returns_none() {
        let xml = "<result><sessionId>abc</sessionId></result>";
        assert_eq!(element_value(xml, "serverUrl"), None);
    }

    #[test]
    fn first_occurrence_wins() {
        let xml = "<r><v>first</v><v>second</v></r>";
        assert_eq!(element_value(xml, "v").as_deref(), Some("first"));
    }

    #[test]
    fn unescapes_entities() {
        let xml = "<msg>a &amp; b</msg>";
        assert_eq!(element_value(xml, "msg").as_deref(), Some("a & b"));
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape("p<a&s>s"), "p&lt;a&amp;s&gt;s");
    }
}
