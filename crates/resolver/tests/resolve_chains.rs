//! End-to-end trust-chain resolution tests.
//!
//! Each test stages a small federation in a [`MemoryObtainer`] — entity
//! configurations, fetch endpoints, subordinate statements — and drives the
//! full resolve → verify → chains → filter pipeline, checking the chain
//! invariants: leaf-first ordering, issuer/subject linkage, time validity,
//! and signature verification under the next statement's keys.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use chrono::Utc;
use fedtrust_resolver::{
    MemoryObtainer, ResolveResponse, StatementCache, StatementFetcher, TrustAnchor, TrustChain,
    TrustResolver,
};
use fedtrust_statement::{
    Jwks, set_ops,
    testutil::{StatementSigner, entity_configuration_payload, subordinate_payload},
};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One federation participant: an identifier plus its signing identity.
struct TestEntity {
    id: String,
    signer: StatementSigner,
}

impl TestEntity {
    fn new(id: &str) -> Self {
        Self { id: id.to_string(), signer: StatementSigner::generate(id) }
    }

    fn jwks(&self) -> Jwks {
        self.signer.jwks()
    }

    fn fetch_endpoint(&self) -> String {
        format!("{}/fetch", self.id)
    }

    /// Entity-configuration payload with authority hints.
    fn leaf_payload(&self, hints: &[&TestEntity]) -> Value {
        let mut payload = entity_configuration_payload(&self.id, &self.jwks());
        if !hints.is_empty() {
            payload["authority_hints"] = json!(hints.iter().map(|h| &h.id).collect::<Vec<_>>());
        }
        payload
    }

    /// Entity-configuration payload of an authority: hints plus the
    /// federation fetch endpoint the resolver descends through.
    fn authority_payload(&self, hints: &[&TestEntity]) -> Value {
        let mut payload = self.leaf_payload(hints);
        payload["metadata"] = json!({
            "federation_entity": { "federation_fetch_endpoint": self.fetch_endpoint() }
        });
        payload
    }

    fn register(&self, obtainer: &MemoryObtainer, payload: &Value) {
        obtainer.add_entity_configuration(&self.id, self.signer.sign(payload));
    }

    /// Registers the subordinate statement this entity issues about
    /// `subject`, carrying the subject's keys.
    fn attest(&self, obtainer: &MemoryObtainer, subject: &TestEntity) {
        let payload = subordinate_payload(&self.id, &subject.id, &subject.jwks());
        obtainer.add_subordinate_statement(
            &self.fetch_endpoint(),
            &subject.id,
            &self.id,
            self.signer.sign(&payload),
        );
    }
}

fn resolver_over(
    obtainer: &MemoryObtainer,
    anchors: Vec<TrustAnchor>,
    starting: &str,
) -> TrustResolver {
    let fetcher =
        StatementFetcher::with_cache(Arc::new(obtainer.clone()), StatementCache::new());
    TrustResolver::new(anchors, starting).with_fetcher(fetcher)
}

/// Checks the chain invariants: `S₀` is the starting entity's self-signed
/// configuration, every later statement links subject to the previous
/// issuer, the last issuer is the anchor, every statement is time-valid,
/// every signature verifies under the keys carried one step up, and the
/// last statement verifies under the anchor's keys.
fn assert_chain_invariants(chain: &TrustChain, starting: &str, anchor: &TestEntity) {
    let statements = chain.statements();
    assert!(!statements.is_empty());

    assert_eq!(statements[0].issuer(), starting);
    assert_eq!(statements[0].subject(), starting);
    for i in 1..statements.len() {
        assert_eq!(statements[i].subject(), statements[i - 1].issuer());
    }
    let last = statements.last().unwrap();
    assert_eq!(last.issuer(), anchor.id);

    let now = Utc::now();
    for stmt in statements {
        assert!(stmt.time_valid(now));
    }

    for i in 0..statements.len() - 1 {
        assert!(
            statements[i].verify(statements[i + 1].jwks()),
            "statement {i} must verify under the keys carried by statement {}",
            i + 1
        );
    }
    assert!(last.verify(&anchor.jwks()), "the last statement verifies under the anchor keys");
}

// ===========================================================================
// S1: single-hop happy path
// ===========================================================================

#[tokio::test]
async fn single_hop_yields_one_chain() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    entity.register(&obtainer, &entity.leaf_payload(&[&anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    anchor.attest(&obtainer, &entity);

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    let chains = resolver.resolve_to_valid_chains().await;

    assert_eq!(chains.len(), 1);
    let chain = &chains.as_slice()[0];
    assert_eq!(chain.len(), 2);
    assert_chain_invariants(chain, &entity.id, &anchor);
}

#[tokio::test]
async fn single_hop_with_configured_anchor_keys() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    entity.register(&obtainer, &entity.leaf_payload(&[&anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    anchor.attest(&obtainer, &entity);

    let mut resolver = resolver_over(
        &obtainer,
        vec![TrustAnchor::with_jwks(&anchor.id, anchor.jwks())],
        &entity.id,
    );
    assert_eq!(resolver.resolve_to_valid_chains().await.len(), 1);

    // Wrong out-of-band keys override the (correct) published ones.
    let rogue = StatementSigner::generate("rogue");
    let mut resolver = resolver_over(
        &obtainer,
        vec![TrustAnchor::with_jwks(&anchor.id, rogue.jwks())],
        &entity.id,
    );
    assert!(resolver.resolve_to_valid_chains().await.is_empty());
}

// ===========================================================================
// S2: two-hop chain through an intermediate
// ===========================================================================

#[tokio::test]
async fn two_hop_chain_has_three_statements() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let intermediate = TestEntity::new("https://i.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    entity.register(&obtainer, &entity.leaf_payload(&[&intermediate]));
    intermediate.register(&obtainer, &intermediate.authority_payload(&[&anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    intermediate.attest(&obtainer, &entity);
    anchor.attest(&obtainer, &intermediate);

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    let chains = resolver.resolve_to_valid_chains().await;

    assert_eq!(chains.len(), 1);
    let chain = &chains.as_slice()[0];
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.statements()[1].issuer(), intermediate.id);
    assert_chain_invariants(chain, &entity.id, &anchor);
}

// ===========================================================================
// S3: broken signature
// ===========================================================================

#[tokio::test]
async fn wrong_signing_key_yields_no_chains() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    entity.register(&obtainer, &entity.leaf_payload(&[&anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));

    // The subordinate statement is signed by a key the anchor never
    // published: structurally fine, cryptographically worthless.
    let rogue = StatementSigner::generate("rogue");
    let payload = subordinate_payload(&anchor.id, &entity.id, &entity.jwks());
    obtainer.add_subordinate_statement(
        &anchor.fetch_endpoint(),
        &entity.id,
        &anchor.id,
        rogue.sign(&payload),
    );

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    assert!(resolver.resolve_to_valid_chains().await.is_empty());
}

// ===========================================================================
// S4: expired intermediate
// ===========================================================================

#[tokio::test]
async fn expired_intermediate_yields_no_chains() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let intermediate = TestEntity::new("https://i.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    entity.register(&obtainer, &entity.leaf_payload(&[&intermediate]));

    let mut expired = intermediate.authority_payload(&[&anchor]);
    expired["exp"] = json!(Utc::now().timestamp() - 60);
    intermediate.register(&obtainer, &expired);

    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    intermediate.attest(&obtainer, &entity);
    anchor.attest(&obtainer, &intermediate);

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    assert!(resolver.resolve_to_valid_chains().await.is_empty());
}

// ===========================================================================
// S5: multiple authorities, one valid
// ===========================================================================

#[tokio::test]
async fn unreachable_authority_prunes_only_its_branch() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let unreachable = TestEntity::new("https://down.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    // `unreachable` is hinted first but never registered.
    entity.register(&obtainer, &entity.leaf_payload(&[&unreachable, &anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    anchor.attest(&obtainer, &entity);

    let mut resolver = resolver_over(
        &obtainer,
        vec![TrustAnchor::new(&unreachable.id), TrustAnchor::new(&anchor.id)],
        &entity.id,
    );
    let chains = resolver.resolve_to_valid_chains().await;

    assert_eq!(chains.len(), 1);
    assert_chain_invariants(&chains.as_slice()[0], &entity.id, &anchor);
}

// ===========================================================================
// Fatal: unreachable starting entity
// ===========================================================================

#[tokio::test]
async fn unreachable_starting_entity_yields_empty_chains() {
    let obtainer = MemoryObtainer::new();
    let mut resolver = resolver_over(
        &obtainer,
        vec![TrustAnchor::new("https://ta.example.org")],
        "https://missing.example.org",
    );
    assert!(resolver.resolve_to_valid_chains().await.is_empty());
}

// ===========================================================================
// Cyclic authority graph
// ===========================================================================

#[tokio::test]
async fn cyclic_authority_hints_terminate() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let intermediate = TestEntity::new("https://i.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    // The intermediate hints back at the entity as well as up at the
    // anchor; the back-edge must be skipped, not followed forever.
    entity.register(&obtainer, &entity.leaf_payload(&[&intermediate]));
    intermediate.register(&obtainer, &intermediate.authority_payload(&[&entity, &anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    intermediate.attest(&obtainer, &entity);
    anchor.attest(&obtainer, &intermediate);

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    let chains = resolver.resolve_to_valid_chains().await;

    assert_eq!(chains.len(), 1);
    assert_eq!(chains.as_slice()[0].len(), 3);
    assert_chain_invariants(&chains.as_slice()[0], &entity.id, &anchor);
}

// ===========================================================================
// Metadata policies along the chain
// ===========================================================================

#[tokio::test]
async fn chain_policy_shapes_effective_metadata() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    let mut leaf = entity.leaf_payload(&[&anchor]);
    leaf["metadata"] = json!({
        "openid_provider": {
            "issuer": "https://e.example.org",
            "contacts": ["ops@e.example.org"],
        }
    });
    entity.register(&obtainer, &leaf);
    anchor.register(&obtainer, &anchor.authority_payload(&[]));

    let mut attestation = subordinate_payload(&anchor.id, &entity.id, &entity.jwks());
    attestation["metadata_policy"] = json!({
        "openid_provider": { "contacts": { "add": ["federation@ta.example.org"] } }
    });
    obtainer.add_subordinate_statement(
        &anchor.fetch_endpoint(),
        &entity.id,
        &anchor.id,
        anchor.signer.sign(&attestation),
    );

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    let chains = resolver.resolve_to_valid_chains().await;
    assert_eq!(chains.len(), 1);

    let metadata = chains.as_slice()[0].metadata().unwrap().unwrap();
    assert_eq!(
        metadata.rest["openid_provider"]["contacts"],
        json!(["ops@e.example.org", "federation@ta.example.org"])
    );

    let response = ResolveResponse::for_chain(
        &chains.as_slice()[0],
        "https://resolver.example.org",
        None,
    )
    .unwrap();
    assert_eq!(response.sub, entity.id);
    assert_eq!(response.trust_chain.len(), 2);
}

#[tokio::test]
async fn policy_violation_filters_the_chain() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    let mut leaf = entity.leaf_payload(&[&anchor]);
    leaf["metadata"] = json!({ "openid_provider": { "subject_type": "public" } });
    entity.register(&obtainer, &leaf);
    anchor.register(&obtainer, &anchor.authority_payload(&[]));

    let mut attestation = subordinate_payload(&anchor.id, &entity.id, &entity.jwks());
    attestation["metadata_policy"] = json!({
        "openid_provider": { "subject_type": { "one_of": ["pairwise"] } }
    });
    obtainer.add_subordinate_statement(
        &anchor.fetch_endpoint(),
        &entity.id,
        &anchor.id,
        anchor.signer.sign(&attestation),
    );

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);
    let chains = resolver.resolve_to_valid_chains().await;
    assert!(chains.is_empty(), "the signature-valid chain must fail the metadata filter");
}

// ===========================================================================
// Entity-type filtering
// ===========================================================================

#[tokio::test]
async fn entity_types_prune_starting_metadata() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    let mut leaf = entity.leaf_payload(&[&anchor]);
    leaf["metadata"] = json!({
        "federation_entity": { "organization_name": "Example" },
        "openid_provider": { "issuer": "https://e.example.org" },
        "oauth_client": { "client_name": "demo" },
    });
    entity.register(&obtainer, &leaf);
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    anchor.attest(&obtainer, &entity);

    let mut resolver = resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id)
        .entity_types(vec!["openid_provider".into()]);
    let chains = resolver.resolve_to_valid_chains().await;

    assert_eq!(chains.len(), 1);
    let metadata = chains.as_slice()[0].metadata().unwrap().unwrap();
    assert!(metadata.federation_entity.is_none());
    assert!(metadata.rest.contains_key("openid_provider"));
    assert!(!metadata.rest.contains_key("oauth_client"));
}

// ===========================================================================
// Idempotence
// ===========================================================================

#[tokio::test]
async fn repeated_resolution_yields_the_same_chains() {
    let obtainer = MemoryObtainer::new();
    let entity = TestEntity::new("https://e.example.org");
    let intermediate = TestEntity::new("https://i.example.org");
    let anchor = TestEntity::new("https://ta.example.org");

    entity.register(&obtainer, &entity.leaf_payload(&[&intermediate]));
    intermediate.register(&obtainer, &intermediate.authority_payload(&[&anchor]));
    anchor.register(&obtainer, &anchor.authority_payload(&[]));
    intermediate.attest(&obtainer, &entity);
    anchor.attest(&obtainer, &intermediate);

    let mut resolver =
        resolver_over(&obtainer, vec![TrustAnchor::new(&anchor.id)], &entity.id);

    let first: Vec<String> = resolver
        .resolve_to_valid_chains()
        .await
        .iter()
        .map(|chain| chain.raw_tokens().join(" "))
        .collect();
    let second: Vec<String> = resolver
        .resolve_to_valid_chains()
        .await
        .iter()
        .map(|chain| chain.raw_tokens().join(" "))
        .collect();

    assert!(!first.is_empty());
    assert!(set_ops::unordered_equal(&first, &second));
}
