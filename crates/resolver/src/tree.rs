//! Trust tree construction, verification, and flattening.
//!
//! The tree is rooted at the starting entity; each child node is one of the
//! entity's superiors, discovered through its authority hints. Construction
//! (`resolve`) only checks structure and time validity — signatures come
//! later, in `verify_signatures`, once the whole tree is known, because
//! keys flow downward from the anchors: a node's statements verify under
//! the key set carried by the subordinate statement of an already-verified
//! child.

use std::{future::Future, pin::Pin, sync::Arc};

use chrono::Utc;
use fedtrust_statement::EntityStatement;

use crate::{fetcher::StatementFetcher, resolver::TrustAnchor};

/// Maximum authority-hint descent depth.
///
/// Real federations are a handful of levels deep; the cap only exists so a
/// pathological or adversarial authority graph cannot recurse unboundedly.
pub const MAX_RESOLVE_DEPTH: usize = 16;

/// A node of the trust tree.
///
/// `entity` is the node's self-signed configuration, `subordinate` the
/// statement this node's entity issued about the entity below it in the
/// tree (absent on the root), and `authorities` one child per authority
/// hint — failed hints keep their slot as an empty node until
/// `verify_signatures` prunes them.
#[derive(Debug, Default)]
pub(crate) struct TrustTree {
    pub(crate) entity: Option<Arc<EntityStatement>>,
    pub(crate) subordinate: Option<Arc<EntityStatement>>,
    pub(crate) authorities: Vec<TrustTree>,
}

impl TrustTree {
    /// Recursively discovers authority paths toward the anchors.
    ///
    /// `path` carries the entity identifiers on the current descent; hints
    /// already present are skipped, which terminates cyclic authority
    /// graphs.
    pub(crate) fn resolve<'a>(
        &'a mut self,
        fetcher: &'a StatementFetcher,
        anchors: &'a [TrustAnchor],
        path: &'a mut Vec<String>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let Some(entity) = self.entity.clone() else {
                return;
            };
            if anchors.iter().any(|anchor| anchor.entity_id == entity.issuer()) {
                // Reached a trust anchor; nothing above it is relevant.
                return;
            }
            if path.len() >= MAX_RESOLVE_DEPTH {
                tracing::debug!(entity = %entity.issuer(), "descent depth cap reached");
                return;
            }
            for hint in entity.authority_hints() {
                if path.iter().any(|seen| seen == hint) {
                    tracing::debug!(
                        authority = %hint,
                        "skipping authority hint already on the descent path"
                    );
                    self.authorities.push(TrustTree::default());
                    continue;
                }
                let child = resolve_authority(&entity, hint, fetcher, anchors, path).await;
                // Failed hints keep their slot; verification prunes them.
                self.authorities.push(child.unwrap_or_default());
            }
        })
    }

    /// Post-order signature verification; prunes untrusted children in
    /// place and returns whether any trusted path remains below this node.
    pub(crate) fn verify_signatures(&mut self, anchors: &[TrustAnchor]) -> bool {
        let Some(entity) = self.entity.clone() else {
            return false;
        };

        if let Some(subordinate) = self.subordinate.clone() {
            for anchor in anchors {
                if anchor.entity_id == entity.issuer()
                    && entity.issuer() == entity.subject()
                    && anchor.entity_id == subordinate.issuer()
                {
                    // This node is the trust anchor itself. Prefer the keys
                    // configured for the anchor; fall back to the ones in
                    // its own configuration.
                    let jwks = match &anchor.jwks {
                        Some(jwks) if !jwks.is_empty() => jwks,
                        _ => entity.jwks(),
                    };
                    return entity.verify(jwks) && subordinate.verify(jwks);
                }
            }
        }

        let own_subordinate = self.subordinate.clone();
        self.authorities.retain_mut(|child| {
            if !child.verify_signatures(anchors) {
                return false;
            }
            // The child is trusted from some anchor; its subordinate
            // statement carries the keys that attest to this node.
            let Some(child_subordinate) = child.subordinate.clone() else {
                return false;
            };
            let jwks = child_subordinate.jwks();
            if !entity.verify(jwks) {
                tracing::debug!(
                    entity = %entity.issuer(),
                    authority = %child_subordinate.issuer(),
                    "entity configuration does not verify under attested keys"
                );
                return false;
            }
            if let Some(subordinate) = &own_subordinate
                && !subordinate.verify(jwks)
            {
                tracing::debug!(
                    entity = %entity.issuer(),
                    authority = %child_subordinate.issuer(),
                    "subordinate statement does not verify under attested keys"
                );
                return false;
            }
            true
        });
        !self.authorities.is_empty()
    }

    /// Post-order flattening into chains of subordinate statements,
    /// leaf-end first. The starting entity's configuration is prepended by
    /// the resolver.
    pub(crate) fn chains(&self) -> Vec<Vec<Arc<EntityStatement>>> {
        if self.authorities.is_empty() {
            return match &self.subordinate {
                Some(subordinate) => vec![vec![Arc::clone(subordinate)]],
                None => Vec::new(),
            };
        }
        let mut chains = Vec::new();
        for authority in &self.authorities {
            for child_chain in authority.chains() {
                match &self.subordinate {
                    None => chains.push(child_chain),
                    Some(subordinate) => {
                        let mut chain = Vec::with_capacity(child_chain.len() + 1);
                        chain.push(Arc::clone(subordinate));
                        chain.extend(child_chain);
                        chains.push(chain);
                    },
                }
            }
        }
        chains
    }
}

/// Resolves a single authority hint into a child node, or nothing when any
/// structural check fails. Every rejection is logged at debug and prunes
/// only this branch.
async fn resolve_authority(
    entity: &Arc<EntityStatement>,
    authority_id: &str,
    fetcher: &StatementFetcher,
    anchors: &[TrustAnchor],
    path: &mut Vec<String>,
) -> Option<TrustTree> {
    let authority = match fetcher.entity_configuration(authority_id).await {
        Ok(stmt) => stmt,
        Err(error) => {
            tracing::debug!(authority = %authority_id, %error, "authority configuration unavailable");
            return None;
        },
    };
    if authority.issuer() != authority_id
        || authority.subject() != authority_id
        || !authority.time_valid(Utc::now())
    {
        tracing::debug!(authority = %authority_id, "authority configuration rejected");
        return None;
    }
    let Some(endpoint) =
        authority.metadata().and_then(|m| m.federation_fetch_endpoint()).map(str::to_string)
    else {
        tracing::debug!(authority = %authority_id, "authority advertises no fetch endpoint");
        return None;
    };

    let subordinate =
        match fetcher.subordinate_statement(&endpoint, entity.issuer(), authority_id).await {
            Ok(stmt) => stmt,
            Err(error) => {
                tracing::debug!(authority = %authority_id, %error, "subordinate statement unavailable");
                return None;
            },
        };
    if subordinate.issuer() != authority_id
        || subordinate.subject() != entity.issuer()
        || !subordinate.time_valid(Utc::now())
    {
        tracing::debug!(authority = %authority_id, "subordinate statement rejected");
        return None;
    }

    let mut child = TrustTree {
        entity: Some(authority),
        subordinate: Some(subordinate),
        authorities: Vec::new(),
    };
    path.push(authority_id.to_string());
    child.resolve(fetcher, anchors, path).await;
    path.pop();
    Some(child)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use fedtrust_statement::{
        Jwks, parse_entity_statement,
        testutil::{StatementSigner, entity_configuration_payload, subordinate_payload},
    };

    use super::*;

    fn configuration(signer: &StatementSigner, entity_id: &str) -> Arc<EntityStatement> {
        let payload = entity_configuration_payload(entity_id, &signer.jwks());
        Arc::new(parse_entity_statement(signer.sign(&payload).as_bytes()).unwrap())
    }

    fn subordinate(
        signer: &StatementSigner,
        issuer: &str,
        subject: &str,
        subject_jwks: &Jwks,
    ) -> Arc<EntityStatement> {
        let payload = subordinate_payload(issuer, subject, subject_jwks);
        Arc::new(parse_entity_statement(signer.sign(&payload).as_bytes()).unwrap())
    }

    /// E → TA, built by hand: the anchor node carries TA's configuration
    /// and the statement TA issued about E.
    fn single_hop() -> (TrustTree, StatementSigner, StatementSigner) {
        let entity_signer = StatementSigner::generate("e");
        let anchor_signer = StatementSigner::generate("ta");
        let entity = configuration(&entity_signer, "https://e.example.org");
        let anchor = configuration(&anchor_signer, "https://ta.example.org");
        let attestation = subordinate(
            &anchor_signer,
            "https://ta.example.org",
            "https://e.example.org",
            &entity_signer.jwks(),
        );

        let tree = TrustTree {
            entity: Some(entity),
            subordinate: None,
            authorities: vec![TrustTree {
                entity: Some(anchor),
                subordinate: Some(attestation),
                authorities: Vec::new(),
            }],
        };
        (tree, entity_signer, anchor_signer)
    }

    #[test]
    fn test_verify_single_hop_survives() {
        let (mut tree, _, _) = single_hop();
        let anchors = vec![TrustAnchor::new("https://ta.example.org")];
        assert!(tree.verify_signatures(&anchors));
        assert_eq!(tree.authorities.len(), 1);
    }

    #[test]
    fn test_verify_prunes_on_wrong_attestation_key() {
        let (mut tree, entity_signer, _) = single_hop();
        // Re-issue the attestation from a key the anchor never published.
        let rogue = StatementSigner::generate("rogue");
        tree.authorities[0].subordinate = Some(subordinate(
            &rogue,
            "https://ta.example.org",
            "https://e.example.org",
            &entity_signer.jwks(),
        ));

        let anchors = vec![TrustAnchor::new("https://ta.example.org")];
        assert!(!tree.verify_signatures(&anchors));
        assert!(tree.authorities.is_empty(), "failed child must be pruned in place");
    }

    #[test]
    fn test_verify_prefers_configured_anchor_keys() {
        let (mut tree, _, anchor_signer) = single_hop();
        // Anchor configured with the right keys out of band.
        let anchors =
            vec![TrustAnchor::with_jwks("https://ta.example.org", anchor_signer.jwks())];
        assert!(tree.verify_signatures(&anchors));

        // Anchor configured with the wrong keys must fail even though the
        // anchor's own configuration carries the right ones.
        let (mut tree, _, _) = single_hop();
        let wrong = StatementSigner::generate("wrong");
        let anchors = vec![TrustAnchor::with_jwks("https://ta.example.org", wrong.jwks())];
        assert!(!tree.verify_signatures(&anchors));
    }

    #[test]
    fn test_verify_empty_placeholder_node_fails() {
        let mut placeholder = TrustTree::default();
        assert!(!placeholder.verify_signatures(&[TrustAnchor::new("https://ta.example.org")]));
    }

    #[test]
    fn test_chains_root_without_authorities_is_empty() {
        let signer = StatementSigner::generate("e");
        let tree = TrustTree {
            entity: Some(configuration(&signer, "https://e.example.org")),
            subordinate: None,
            authorities: Vec::new(),
        };
        assert!(tree.chains().is_empty(), "a root without a subordinate yields no chains");
    }

    #[test]
    fn test_chains_single_hop_shape() {
        let (tree, _, _) = single_hop();
        let chains = tree.chains();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 1);
        assert_eq!(chains[0][0].issuer(), "https://ta.example.org");
        assert_eq!(chains[0][0].subject(), "https://e.example.org");
    }

    #[test]
    fn test_chains_two_hop_ordering() {
        let entity_signer = StatementSigner::generate("e");
        let intermediate_signer = StatementSigner::generate("i");
        let anchor_signer = StatementSigner::generate("ta");

        let tree = TrustTree {
            entity: Some(configuration(&entity_signer, "https://e.example.org")),
            subordinate: None,
            authorities: vec![TrustTree {
                entity: Some(configuration(&intermediate_signer, "https://i.example.org")),
                subordinate: Some(subordinate(
                    &intermediate_signer,
                    "https://i.example.org",
                    "https://e.example.org",
                    &entity_signer.jwks(),
                )),
                authorities: vec![TrustTree {
                    entity: Some(configuration(&anchor_signer, "https://ta.example.org")),
                    subordinate: Some(subordinate(
                        &anchor_signer,
                        "https://ta.example.org",
                        "https://i.example.org",
                        &intermediate_signer.jwks(),
                    )),
                    authorities: Vec::new(),
                }],
            }],
        };

        let chains = tree.chains();
        assert_eq!(chains.len(), 1);
        let chain = &chains[0];
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].issuer(), "https://i.example.org");
        assert_eq!(chain[1].issuer(), "https://ta.example.org");
    }
}
