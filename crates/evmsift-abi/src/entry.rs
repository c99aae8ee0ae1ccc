//! The ABI entry model — one entry per function/event/fallback signature,
//! in the standard Ethereum ABI JSON shape.
//!
//! Fields the decoder does not use (`outputs`, `stateMutability`,
//! `internalType`) are preserved so contract files round-trip unchanged.

use serde::{Deserialize, Serialize};

/// Entry kind discriminator. Only `function` and `event` entries carry
/// selectors; the rest are tolerated in contract files and left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiKind {
    Function,
    Event,
    Constructor,
    Fallback,
    Receive,
    Error,
    #[serde(other)]
    Unknown,
}

impl AbiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbiKind::Function => "function",
            AbiKind::Event => "event",
            AbiKind::Constructor => "constructor",
            AbiKind::Fallback => "fallback",
            AbiKind::Receive => "receive",
            AbiKind::Error => "error",
            AbiKind::Unknown => "unknown",
        }
    }
}

/// One typed parameter. `components` is present exactly for tuple types,
/// `indexed` only on event parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(
        default,
        rename = "internalType",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
}

impl AbiParam {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            components: None,
            indexed: None,
            internal_type: None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed == Some(true)
    }

    /// The canonical type string used in signatures: tuples collapse to a
    /// parenthesized component list, keeping any array suffix.
    pub fn canonical_type(&self) -> String {
        if let Some(suffix) = self.ty.strip_prefix("tuple") {
            let inner = self
                .components
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .map(AbiParam::canonical_type)
                .collect::<Vec<_>>()
                .join(",");
            format!("({inner}){suffix}")
        } else {
            self.ty.clone()
        }
    }
}

/// Provenance attached to entries discovered through the signature
/// database: the raw selector and the block where it was first seen.
/// The `_dlt_meta` key is fixed by the persisted contract file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMeta {
    pub selector: String,
    pub block: u64,
}

/// One ABI entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: AbiKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<AbiParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,
    #[serde(
        default,
        rename = "stateMutability",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<String>,
    #[serde(default, rename = "_dlt_meta", skip_serializing_if = "Option::is_none")]
    pub discovered: Option<DiscoveryMeta>,
}

impl AbiEntry {
    /// Canonical signature: `name(type1,type2,...)`, parameter names ignored.
    pub fn signature(&self) -> String {
        let types = self
            .inputs
            .iter()
            .map(AbiParam::canonical_type)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.name, types)
    }

    /// Number of parameters currently marked indexed.
    pub fn indexed_count(&self) -> usize {
        self.inputs.iter().filter(|p| p.is_indexed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_signature_plain() {
        let entry = AbiEntry {
            kind: AbiKind::Function,
            name: "transfer".into(),
            inputs: vec![
                AbiParam::new("_to", "address"),
                AbiParam::new("_value", "uint256"),
            ],
            outputs: None,
            anonymous: None,
            state_mutability: None,
            discovered: None,
        };
        assert_eq!(entry.signature(), "transfer(address,uint256)");
    }

    #[test]
    fn canonical_signature_collapses_tuples() {
        let mut tup = AbiParam::new("info", "tuple[]");
        tup.components = Some(vec![
            AbiParam::new("a", "uint256"),
            AbiParam::new("b", "address"),
        ]);
        let entry = AbiEntry {
            kind: AbiKind::Function,
            name: "register".into(),
            inputs: vec![tup, AbiParam::new("flag", "bool")],
            outputs: None,
            anonymous: None,
            state_mutability: None,
            discovered: None,
        };
        assert_eq!(entry.signature(), "register((uint256,address)[],bool)");
    }

    #[test]
    fn entry_json_roundtrip_keeps_metadata() {
        let json = r#"{
            "type": "event",
            "name": "Transfer",
            "inputs": [
                {"name": "from", "type": "address", "indexed": true, "internalType": "address"},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ],
            "anonymous": false,
            "_dlt_meta": {"selector": "0xddf252ad", "block": 100}
        }"#;
        let entry: AbiEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.kind, AbiKind::Event);
        assert_eq!(entry.indexed_count(), 2);
        assert_eq!(entry.discovered.as_ref().unwrap().block, 100);

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["inputs"][0]["internalType"], "address");
        assert_eq!(back["_dlt_meta"]["selector"], "0xddf252ad");
    }

    #[test]
    fn unknown_kind_tolerated() {
        let entry: AbiEntry =
            serde_json::from_str(r#"{"type": "impl", "name": "x", "inputs": []}"#).unwrap();
        assert_eq!(entry.kind, AbiKind::Unknown);
    }
}
