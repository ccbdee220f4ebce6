//! Minimal XML-RPC codec covering the value types rTorrent emits.

use std::collections::BTreeMap;

use thiserror::Error;

/// XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    /// `<string>` or an untyped value.
    Str(String),
    /// `<i4>`, `<int>` or `<i8>`.
    Int(i64),
    /// `<boolean>`.
    Bool(bool),
    /// `<double>`.
    Double(f64),
    /// `<array>`.
    Array(Vec<XmlValue>),
    /// `<struct>`.
    Struct(BTreeMap<String, XmlValue>),
}

impl XmlValue {
    /// Integer view; numeric strings are accepted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bool(value) => Some(i64::from(*value)),
            Self::Str(text) => text.trim().parse().ok(),
            Self::Double(_) | Self::Array(_) | Self::Struct(_) => None,
        }
    }

    /// String view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Array view.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for XmlValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Failure decoding an XML-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlRpcError {
    /// The document is not a well-formed method response.
    #[error("malformed XML-RPC response: {0}")]
    Malformed(&'static str),
    /// The daemon answered with a fault.
    #[error("XML-RPC fault {code}: {message}")]
    Fault {
        /// Fault code.
        code: i64,
        /// Fault description.
        message: String,
    },
}

/// Encode a `methodCall` document.
#[must_use]
pub fn encode_call(method: &str, params: &[XmlValue]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    escape_into(&mut out, method);
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn encode_value(out: &mut String, value: &XmlValue) {
    out.push_str("<value>");
    match value {
        XmlValue::Str(text) => {
            out.push_str("<string>");
            escape_into(out, text);
            out.push_str("</string>");
        }
        XmlValue::Int(number) => {
            let tag = if i32::try_from(*number).is_ok() { "i4" } else { "i8" };
            out.push_str(&format!("<{tag}>{number}</{tag}>"));
        }
        XmlValue::Bool(flag) => {
            out.push_str(&format!("<boolean>{}</boolean>", u8::from(*flag)));
        }
        XmlValue::Double(number) => {
            out.push_str(&format!("<double>{number}</double>"));
        }
        XmlValue::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        XmlValue::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Decode a `methodResponse` document into its single return value.
///
/// # Errors
///
/// Returns [`XmlRpcError::Fault`] for fault responses and
/// [`XmlRpcError::Malformed`] for anything that is not a method response.
pub fn decode_response(body: &str) -> Result<XmlValue, XmlRpcError> {
    let root = Parser::new(body)
        .document()
        .ok_or(XmlRpcError::Malformed("document is not well-formed"))?;
    if root.tag != "methodResponse" {
        return Err(XmlRpcError::Malformed("root element is not methodResponse"));
    }
    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .map(decode_value)
            .transpose()?
            .ok_or(XmlRpcError::Malformed("fault without value"))?;
        return Err(fault_from(&value));
    }
    root.child("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
        .ok_or(XmlRpcError::Malformed("response has no return value"))
        .and_then(decode_value)
}

fn fault_from(value: &XmlValue) -> XmlRpcError {
    let XmlValue::Struct(members) = value else {
        return XmlRpcError::Malformed("fault value is not a struct");
    };
    XmlRpcError::Fault {
        code: members
            .get("faultCode")
            .and_then(XmlValue::as_i64)
            .unwrap_or_default(),
        message: members
            .get("faultString")
            .and_then(XmlValue::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn decode_value(node: &Node) -> Result<XmlValue, XmlRpcError> {
    let Some(typed) = node.children.first() else {
        return Ok(XmlValue::Str(node.text.clone()));
    };
    let text = typed.text.trim();
    match typed.tag.as_str() {
        "string" => Ok(XmlValue::Str(typed.text.clone())),
        "i4" | "int" | "i8" => text
            .parse()
            .map(XmlValue::Int)
            .map_err(|_| XmlRpcError::Malformed("invalid integer")),
        "boolean" => match text {
            "1" => Ok(XmlValue::Bool(true)),
            "0" => Ok(XmlValue::Bool(false)),
            _ => Err(XmlRpcError::Malformed("invalid boolean")),
        },
        "double" => text
            .parse()
            .map(XmlValue::Double)
            .map_err(|_| XmlRpcError::Malformed("invalid double")),
        "array" => typed
            .child("data")
            .map_or_else(Vec::new, |data| data.children_by_tag("value"))
            .into_iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()
            .map(XmlValue::Array),
        "struct" => typed
            .children_by_tag("member")
            .into_iter()
            .map(|member| {
                let name = member
                    .child("name")
                    .ok_or(XmlRpcError::Malformed("struct member without name"))?;
                let value = member
                    .child("value")
                    .ok_or(XmlRpcError::Malformed("struct member without value"))?;
                Ok((name.text.clone(), decode_value(value)?))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(XmlValue::Struct),
        _ => Err(XmlRpcError::Malformed("unsupported value type")),
    }
}

#[derive(Debug, Default)]
struct Node {
    tag: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, tag: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.tag == tag)
    }

    fn children_by_tag(&self, tag: &str) -> Vec<&Self> {
        self.children.iter().filter(|child| child.tag == tag).collect()
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn document(&mut self) -> Option<Node> {
        self.skip_misc();
        self.element()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn skip_past(&mut self, terminator: &str) -> bool {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                true
            }
            None => false,
        }
    }

    fn skip_misc(&mut self) {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            let skipped = if rest.starts_with("<?") {
                self.skip_past("?>")
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")
            } else if rest.starts_with("<!DOCTYPE") {
                self.skip_past(">")
            } else {
                false
            };
            if !skipped {
                break;
            }
        }
    }

    fn element(&mut self) -> Option<Node> {
        let rest = self.rest().strip_prefix('<')?;
        let name_len = rest
            .find(|ch: char| ch.is_ascii_whitespace() || ch == '>' || ch == '/')
            .unwrap_or(rest.len());
        if name_len == 0 {
            return None;
        }
        let tag = rest[..name_len].to_string();
        self.pos += 1 + name_len;

        // Attributes carry nothing XML-RPC needs.
        let close = self.rest().find('>')?;
        let self_closing = self.rest()[..close].ends_with('/');
        self.pos += close + 1;
        let mut node = Node {
            tag,
            ..Node::default()
        };
        if self_closing {
            return Some(node);
        }

        let mut raw_text = String::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            if let Some(after) = rest.strip_prefix("</") {
                let end = after.find('>')?;
                if after[..end].trim() != node.tag {
                    return None;
                }
                self.pos += 2 + end + 1;
                break;
            }
            if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let end = cdata.find("]]>")?;
                raw_text.push_str(&escape_cdata(&cdata[..end]));
                self.pos += 9 + end + 3;
            } else if rest.starts_with("<!--") {
                if !self.skip_past("-->") {
                    return None;
                }
            } else if rest.starts_with('<') {
                node.children.push(self.element()?);
            } else {
                let run = rest.find('<').unwrap_or(rest.len());
                raw_text.push_str(&rest[..run]);
                self.pos += run;
            }
        }
        node.text = decode_entities(&raw_text);
        Some(node)
    }
}

fn escape_cdata(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map_or_else(
                        || entity.strip_prefix('#').and_then(|dec| dec.parse().ok()),
                        |hex| u32::from_str_radix(hex, 16).ok(),
                    )
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
