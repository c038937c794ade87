//! Hook bindings embedded in node fields.
//!
//! A field like `onClick` binds code blocks when its value has the shape
//!
//! ```json
//! { "hookType": "code", "hookData": [{ "codeId": "code_1234", "params": {} }] }
//! ```
//!
//! [`HookBinding`] is a zero-copy view used during traversal; [`Hook`] is the
//! owned form for building trees.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::EnumString;

/// Kind of hook declared on a node field.
///
/// Parsing is case-insensitive for both `FromStr` and serde, so a hook the
/// relation walk recognises always deserializes as a [`Hook`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum HookType {
    /// Binds code blocks from the forward mapping.
    #[strum(serialize = "code")]
    Code,
    /// Binds a data-source method. Never indexed by the code-block graph.
    #[strum(serialize = "data-source-method")]
    DataSourceMethod,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Code => "code",
            HookType::DataSourceMethod => "data-source-method",
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HookType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HookType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HookType::from_str(&raw)
            .map_err(|_| serde::de::Error::custom(format!("unknown hook type: {raw}")))
    }
}

/// One entry of `hookData`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookData {
    #[serde(default)]
    pub code_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookData {
    pub fn new(code_id: impl Into<String>) -> Self {
        Self {
            code_id: code_id.into(),
            extra: Map::new(),
        }
    }
}

/// Owned hook value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub hook_type: HookType,
    #[serde(default)]
    pub hook_data: Vec<HookData>,
}

impl Hook {
    /// A code hook invoking the given blocks in order.
    pub fn code<I, S>(code_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hook_type: HookType::Code,
            hook_data: code_ids.into_iter().map(HookData::new).collect(),
        }
    }

    /// JSON form, ready to drop into a node field.
    pub fn to_value(&self) -> Value {
        let data: Vec<Value> = self
            .hook_data
            .iter()
            .map(|d| {
                let mut entry = d.extra.clone();
                entry.insert("codeId".to_string(), Value::String(d.code_id.clone()));
                Value::Object(entry)
            })
            .collect();
        let mut map = Map::new();
        map.insert(
            "hookType".to_string(),
            Value::String(self.hook_type.as_str().to_string()),
        );
        map.insert("hookData".to_string(), Value::Array(data));
        Value::Object(map)
    }
}

/// Borrowed view of a code hook inside a node field.
///
/// Only constructed when `hookType` names the code kind and `hookData` is a
/// non-empty array.
#[derive(Clone, Copy, Debug)]
pub struct HookBinding<'a> {
    data: &'a [Value],
}

impl<'a> HookBinding<'a> {
    /// Recognise a code hook in an object value.
    pub fn from_map(map: &'a Map<String, Value>) -> Option<Self> {
        let hook_type = map.get("hookType")?.as_str()?;
        if HookType::from_str(hook_type).ok()? != HookType::Code {
            return None;
        }
        match map.get("hookData")? {
            Value::Array(data) if !data.is_empty() => Some(Self { data }),
            _ => None,
        }
    }

    /// Number of `hookData` entries, including ones without a code id.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Code ids in declaration order. Entries with a missing or empty
    /// `codeId` are skipped.
    pub fn code_ids(self) -> impl Iterator<Item = &'a str> {
        self.data.iter().filter_map(|entry| {
            entry
                .get("codeId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
        })
    }
}
