//! Unknown-selector fallback: resolve a selector through the signature
//! database and speculatively decode each candidate until one fits.
//!
//! Candidates arrive in service order. Each one is parsed, checked against
//! the target selector (the service and the parser can disagree — a
//! mismatch is skipped, not trusted), and then decoded. Function
//! candidates decode strictly so a signature that only explains a prefix
//! of the calldata is rejected; event candidates start with all `indexed`
//! flags cleared and lean on the combination recovery inside
//! [`decode_log`].

use crate::call::decode_call;
use crate::log::{decode_log, DecodedLog};
use evmsift_abi::entry::{AbiEntry, AbiKind};
use evmsift_abi::lookup::{LookupError, SignatureKind, SignatureSource};
use evmsift_abi::selector::{entry_selector, Selector};
use evmsift_abi::signature::parse_signature;
use evmsift_core::value::Value;
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Try to resolve and decode an unknown function selector.
///
/// Returns the winning entry and decoded arguments, or `None` when no
/// candidate matches. Service failures propagate; they are never treated
/// as "no match".
pub async fn fetch_and_decode_call(
    source: &dyn SignatureSource,
    selector: &Selector,
    params: &[u8],
) -> Result<Option<(AbiEntry, IndexMap<String, Value>)>, LookupError> {
    let candidates = source
        .signatures(SignatureKind::Function, &selector.to_hex())
        .await?;
    for candidate in candidates {
        let entry = match parse_signature(AbiKind::Function, &candidate.name) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(signature = %candidate.name, %err, "skipping unparseable candidate signature");
                continue;
            }
        };
        match entry_selector(&entry) {
            Ok(derived) if &derived == selector => {}
            _ => {
                warn!(
                    signature = %candidate.name,
                    selector = %selector,
                    "candidate signature does not hash to the target selector"
                );
                continue;
            }
        }
        match decode_call(&entry, params, true) {
            Ok(args) => return Ok(Some((entry, args))),
            Err(err) => {
                debug!(signature = %candidate.name, %err, "candidate signature does not decode");
            }
        }
    }
    Ok(None)
}

/// Try to resolve and decode an unknown event topic.
///
/// Candidates are parsed as non-anonymous events with every parameter
/// initially non-indexed; the log decoder's recovery search finds the
/// indexed assignment. The returned entry carries the winning flags.
pub async fn fetch_and_decode_log(
    source: &dyn SignatureSource,
    selector: &Selector,
    topics: &[[u8; 32]],
    data: &[u8],
) -> Result<Option<(AbiEntry, DecodedLog)>, LookupError> {
    let candidates = source
        .signatures(SignatureKind::Event, &selector.to_hex())
        .await?;
    for candidate in candidates {
        let mut entry = match parse_signature(AbiKind::Event, &candidate.name) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(signature = %candidate.name, %err, "skipping unparseable candidate signature");
                continue;
            }
        };
        match entry_selector(&entry) {
            Ok(derived) if &derived == selector => {}
            _ => {
                warn!(
                    signature = %candidate.name,
                    selector = %selector,
                    "candidate signature does not hash to the target topic"
                );
                continue;
            }
        }
        entry.anonymous = Some(false);
        for input in entry.inputs.iter_mut() {
            input.indexed.get_or_insert(false);
        }
        match decode_log(&entry, topics, data) {
            Ok(decoded) => {
                if let Some(flags) = &decoded.recovered {
                    for (input, flag) in entry.inputs.iter_mut().zip(flags) {
                        input.indexed = Some(*flag);
                    }
                }
                return Ok(Some((entry, decoded)));
            }
            Err(err) => {
                debug!(signature = %candidate.name, %err, "candidate signature does not decode");
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evmsift_abi::lookup::SigCandidate;

    struct StubSource(Vec<&'static str>);

    #[async_trait]
    impl SignatureSource for StubSource {
        async fn signatures(
            &self,
            _kind: SignatureKind,
            _selector_hex: &str,
        ) -> Result<Vec<SigCandidate>, LookupError> {
            Ok(self
                .0
                .iter()
                .map(|name| SigCandidate {
                    name: name.to_string(),
                    filtered: false,
                })
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SignatureSource for FailingSource {
        async fn signatures(
            &self,
            _kind: SignatureKind,
            _selector_hex: &str,
        ) -> Result<Vec<SigCandidate>, LookupError> {
            Err(LookupError::ServiceNotOk)
        }
    }

    fn transfer_params() -> Vec<u8> {
        let mut data = vec![0u8; 64];
        data[12] = 0x11; // address byte
        data[63] = 0x05; // value 5
        data
    }

    #[tokio::test]
    async fn first_decoding_candidate_wins() {
        // A garbage signature, one that hashes elsewhere, then the real one.
        let source = StubSource(vec![
            "not a signature",
            "approve(address,uint256)",
            "transfer(address,uint256)",
        ]);
        let selector = Selector::function("transfer(address,uint256)");
        let resolved = fetch_and_decode_call(&source, &selector, &transfer_params())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.0.name, "transfer");
        assert_eq!(resolved.1["param_1"].to_string(), "5");
    }

    #[tokio::test]
    async fn candidate_that_does_not_decode_is_skipped() {
        // Same selector target required, so craft two signatures that both
        // hash to the queried selector is impractical; instead verify a
        // non-decoding match yields None.
        let source = StubSource(vec!["transfer(address,uint256)"]);
        let selector = Selector::function("transfer(address,uint256)");
        // 1 byte of calldata cannot satisfy (address, uint256)
        let resolved = fetch_and_decode_call(&source, &selector, &[0u8])
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn service_failure_propagates() {
        let selector = Selector::function("transfer(address,uint256)");
        let err = fetch_and_decode_call(&FailingSource, &selector, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::ServiceNotOk));
    }

    #[tokio::test]
    async fn event_candidate_recovers_indexed_flags() {
        let source = StubSource(vec!["Transfer(address,address,uint256)"]);
        let selector = Selector::event("Transfer(address,address,uint256)");
        let mut from = [0u8; 32];
        from[31] = 0xaa;
        let mut to = [0u8; 32];
        to[31] = 0xbb;
        let mut data = vec![0u8; 32];
        data[31] = 0x07;

        let (entry, decoded) = fetch_and_decode_log(&source, &selector, &[from, to], &data)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded.recovered, Some(vec![true, true, false]));
        assert_eq!(entry.anonymous, Some(false));
        assert_eq!(entry.inputs[0].indexed, Some(true));
        assert_eq!(entry.inputs[2].indexed, Some(false));
        assert_eq!(decoded.fields["param_2"].to_string(), "7");
    }

    #[tokio::test]
    async fn no_candidates_is_a_clean_miss() {
        let source = StubSource(vec![]);
        let selector = Selector::function("transfer(address,uint256)");
        let resolved = fetch_and_decode_call(&source, &selector, &transfer_params())
            .await
            .unwrap();
        assert!(resolved.is_none());
    }
}
