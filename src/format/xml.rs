//! Minimal XML DOM used by the RDF/XML and SPARQL XML results writers

/// Escape text content
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (double-quoted)
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

/// A child node
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builder: add an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder: add a child element
    pub fn child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    /// Builder: add text content
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }


    /// Serialize with two-space indentation. Elements holding only text stay
    /// on one line.
    pub fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }

        let text_only = self.children.iter().all(|c| matches!(c, XmlNode::Text(_)));
        out.push('>');
        if text_only {
            for child in &self.children {
                if let XmlNode::Text(text) = child {
                    out.push_str(&escape_xml(text));
                }
            }
        } else {
            out.push('\n');
            for child in &self.children {
                match child {
                    XmlNode::Element(e) => e.write(out, depth + 1),
                    XmlNode::Text(text) => {
                        out.push_str(&"  ".repeat(depth + 1));
                        out.push_str(&escape_xml(text));
                        out.push('\n');
                    }
                }
            }
            out.push_str(&indent);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

/// Render a complete document with an XML declaration
pub fn document(root: &XmlElement) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    root.write(&mut out, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_document() {
        let root = XmlElement::new("root")
            .attr("xmlns", "http://ex.org/")
            .child(XmlElement::new("empty"))
            .child(XmlElement::new("name").attr("lang", "en").text("A & B"));

        assert_eq!(
            document(&root),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <root xmlns=\"http://ex.org/\">\n  <empty/>\n  <name lang=\"en\">A &amp; B</name>\n</root>\n"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut out = String::new();
        XmlElement::new("a").attr("v", "say \"<hi>\"").write(&mut out, 0);
        assert_eq!(out, "<a v=\"say &quot;&lt;hi&gt;&quot;\"/>\n");
    }
}
