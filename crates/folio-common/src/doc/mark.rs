use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use super::node::Attrs;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkAttrs {
    #[serde(default)]
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(flatten)]
    pub extra: Attrs,
}

impl LinkAttrs {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighlightAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Attrs,
}

/// Inline formatting applied to a text run.
///
/// Marks are ordered; the first mark wraps the text innermost when rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMark", into = "RawMark")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Underline,
    Link(LinkAttrs),
    Highlight(HighlightAttrs),
    Subscript,
    Superscript,
    Unknown { kind: SmolStr, attrs: Option<Value> },
}

impl Mark {
    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link(LinkAttrs::new(href))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Strike => "strike",
            Mark::Code => "code",
            Mark::Underline => "underline",
            Mark::Link(_) => "link",
            Mark::Highlight(_) => "highlight",
            Mark::Subscript => "subscript",
            Mark::Superscript => "superscript",
            Mark::Unknown { kind, .. } => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawMark {
    #[serde(rename = "type")]
    kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Value>,
}

impl From<RawMark> for Mark {
    fn from(raw: RawMark) -> Self {
        fn attrs<A: for<'de> Deserialize<'de> + Default>(value: &Option<Value>) -> Option<A> {
            match value {
                None | Some(Value::Null) => Some(A::default()),
                Some(v) => serde_json::from_value(v.clone()).ok(),
            }
        }
        let typed = match raw.kind.as_str() {
            "bold" => Some(Mark::Bold),
            "italic" => Some(Mark::Italic),
            "strike" => Some(Mark::Strike),
            "code" => Some(Mark::Code),
            "underline" => Some(Mark::Underline),
            "link" => attrs(&raw.attrs).map(Mark::Link),
            "highlight" => attrs(&raw.attrs).map(Mark::Highlight),
            "subscript" => Some(Mark::Subscript),
            "superscript" => Some(Mark::Superscript),
            _ => None,
        };
        // Malformed attrs degrade to an opaque mark rather than failing the whole document.
        typed.unwrap_or(Mark::Unknown {
            kind: raw.kind,
            attrs: raw.attrs,
        })
    }
}

impl From<Mark> for RawMark {
    fn from(mark: Mark) -> Self {
        fn encode<A: Serialize>(attrs: &A) -> Option<Value> {
            match serde_json::to_value(attrs) {
                Ok(Value::Object(map)) if map.is_empty() => None,
                Ok(value) => Some(value),
                Err(_) => None,
            }
        }
        let kind = SmolStr::new(mark.type_name());
        let attrs = match mark {
            Mark::Link(a) => encode(&a),
            Mark::Highlight(a) => encode(&a),
            Mark::Unknown { attrs, .. } => attrs,
            _ => None,
        };
        RawMark { kind, attrs }
    }
}
