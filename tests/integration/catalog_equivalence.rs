#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use sombra_quads::codec::KEY_UPPER_BOUND;
use sombra_quads::store::{IndexQuery, KeyRange};
use sombra_quads::{
    DocumentStore, FieldSet, IndexCatalog, MemoryStore, NTriplesCodec, Pattern, Quad,
    QuadRepository, RepositoryOptions, ResolvedQuery, Staleness, Statement, Term, TermCodec,
};

const SUBJECTS: &[&str] = &["a", "b", "c"];
const PREDICATES: &[&str] = &["p", "q"];
const OBJECTS: &[&str] = &["1", "2", "10"];
const GRAPHS: &[Option<&str>] = &[None, Some("g1"), Some("g2")];

fn ex(local: &str) -> Term {
    Term::iri(format!("http://example.org/{local}"))
}

fn arb_quad() -> impl Strategy<Value = Quad> {
    (
        prop::sample::select(SUBJECTS),
        prop::sample::select(PREDICATES),
        prop::sample::select(OBJECTS),
        prop::sample::select(GRAPHS),
    )
        .prop_map(|(s, p, o, g)| {
            Quad::new(
                ex(s),
                ex(p),
                Term::literal(o),
                g.map_or(Term::DefaultGraph, ex),
            )
        })
}

fn arb_sample() -> impl Strategy<Value = (u8, Quad)> {
    (1u8..16, arb_quad())
}

fn pattern_for(subset: FieldSet, sample: &Quad) -> Pattern {
    subset
        .fields()
        .into_iter()
        .fold(Pattern::any(), |pattern, field| {
            pattern.bind(field, sample.get(field).clone())
        })
}

fn identities(statements: &[Statement]) -> BTreeSet<String> {
    statements
        .iter()
        .filter_map(|s| s.identity().map(|id| id.to_string()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_candidate_index_returns_the_same_statements(
        data in prop::collection::vec(arb_quad(), 0..40),
        (bits, sample) in arb_sample(),
    ) {
        let store = Arc::new(MemoryStore::new());
        let repo = QuadRepository::open(store.clone(), RepositoryOptions::default())
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let mut statements: Vec<Statement> = data.into_iter().map(Statement::new).collect();
        repo.insert(&mut statements)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let subset = FieldSet::from_bits(bits).ok_or_else(|| TestCaseError::fail("mask out of range"))?;
        let pattern = pattern_for(subset, &sample);
        let expected: BTreeSet<String> = statements
            .iter()
            .filter(|s| pattern.matches(s.quad()))
            .filter_map(|s| s.identity().map(|id| id.to_string()))
            .collect();

        let resolved = repo
            .query(&pattern)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(&identities(&resolved), &expected);
        let counted = repo
            .count_matching(&pattern)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(counted, expected.len() as u64);

        let codec = NTriplesCodec;
        let candidates = repo.catalog().candidates(subset);
        prop_assert!(!candidates.is_empty());
        for candidate in candidates {
            let prefix: Vec<String> = candidate
                .order
                .iter()
                .filter_map(|field| pattern.get(*field))
                .map(|term| codec.encode(term))
                .collect();
            prop_assert_eq!(prefix.len(), subset.len());
            let mut end = prefix.clone();
            end.push(KEY_UPPER_BOUND.to_owned());
            let rows = store
                .query_index(
                    &candidate.index.name,
                    &IndexQuery {
                        range: KeyRange::Range { start: prefix, end },
                        include_docs: false,
                        staleness: Staleness::Fresh,
                    },
                )
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            let ids: BTreeSet<String> = rows.into_iter().map(|row| row.id.to_string()).collect();
            prop_assert_eq!(&ids, &expected, "index {} disagrees", candidate.index.name);
        }
    }

    #[test]
    fn range_scans_hold_exactly_the_prefix_completions(
        data in prop::collection::vec(arb_quad(), 1..40),
        (bits, sample) in arb_sample(),
    ) {
        let catalog = Arc::new(IndexCatalog::standard().map_err(|err| TestCaseError::fail(err.to_string()))?);
        let store = Arc::new(MemoryStore::new());
        let repo = QuadRepository::open(store.clone(), RepositoryOptions::default())
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let mut statements: Vec<Statement> = data.into_iter().map(Statement::new).collect();
        repo.insert(&mut statements)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let subset = FieldSet::from_bits(bits).ok_or_else(|| TestCaseError::fail("mask out of range"))?;
        let resolved = repo
            .explain(&pattern_for(subset, &sample))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let ResolvedQuery::RangeScan { index, start, end } = resolved else {
            return Ok(());
        };
        let def = catalog.get(&index).ok_or_else(|| TestCaseError::fail("unknown index"))?;
        let codec = NTriplesCodec;
        let range = KeyRange::Range { start: start.clone(), end };
        for statement in &statements {
            let key: Vec<String> = def
                .fields()
                .iter()
                .map(|field| codec.encode(statement.quad().get(*field)))
                .collect();
            let same_prefix = key[..start.len()] == start[..];
            prop_assert_eq!(range.contains(&key), same_prefix);
        }
    }
}

#[test]
fn lexically_adjacent_values_stay_out_of_ranges() -> sombra_quads::Result<()> {
    let repo = QuadRepository::open(Arc::new(MemoryStore::new()), RepositoryOptions::default())?;
    let mut statements = vec![
        Statement::new(Quad::triple(ex("a"), ex("p"), Term::literal("1"))),
        Statement::new(Quad::triple(ex("a"), ex("p"), Term::literal("10"))),
        Statement::new(Quad::triple(ex("ab"), ex("p"), Term::literal("1"))),
    ];
    repo.insert(&mut statements)?;
    assert_eq!(repo.count_matching(&Pattern::any().subject(ex("a")))?, 2);
    assert_eq!(repo.count_matching(&Pattern::any().object(Term::literal("1")))?, 2);
    assert_eq!(
        repo.count_matching(&Pattern::any().subject(ex("a")).object(Term::literal("1")))?,
        1
    );
    Ok(())
}
