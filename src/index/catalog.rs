use std::hash::Hasher;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use xxhash_rust::xxh64::Xxh64;

use crate::model::{Field, FieldSet};
use crate::types::{QuadError, Result};

use super::types::{IndexDef, ReduceRule};

type FieldOrder = SmallVec<[Field; 4]>;

/// Index and key order chosen to serve one bound-field subset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Coverage<'a> {
    /// Serving index.
    pub index: &'a IndexDef,
    /// Bound fields in the index's key order; a prefix of its fields.
    pub order: &'a [Field],
}

#[derive(Clone, Debug)]
struct Slot {
    index: usize,
    order: FieldOrder,
}

/// Immutable set of composite indexes plus the precomputed mapping from
/// every non-empty bound-field subset to the index that serves it.
///
/// Construction fails unless all 15 subsets are prefix-covered, so
/// resolution never discovers a gap at query time.
#[derive(Clone, Debug)]
pub struct IndexCatalog {
    defs: Vec<IndexDef>,
    table: [Option<Slot>; 16],
    full: usize,
}

impl IndexCatalog {
    /// Validates `defs` and builds the coverage table.
    pub fn new(defs: Vec<IndexDef>) -> Result<Self> {
        validate_definitions(&defs)?;
        let mut table: [Option<Slot>; 16] = Default::default();
        for subset in FieldSet::non_empty_subsets() {
            let Some((index, order)) = prefix_candidates(&defs, subset).into_iter().next() else {
                return Err(QuadError::Configuration(format!(
                    "no index has a key prefix covering {subset}"
                )));
            };
            table[usize::from(subset.bits())] = Some(Slot { index, order });
        }
        let full = match &table[usize::from(FieldSet::ALL.bits())] {
            Some(slot) if defs[slot.index].arity() == Field::ALL.len() => slot.index,
            _ => {
                return Err(QuadError::Configuration(
                    "no four-field index serves fully bound patterns".into(),
                ))
            }
        };
        Ok(Self { defs, table, full })
    }

    /// The six-index catalog covering every subset of four fields.
    pub fn standard() -> Result<Self> {
        Self::new(standard_definitions())
    }

    /// Index definitions in catalog order.
    pub fn definitions(&self) -> &[IndexDef] {
        &self.defs
    }

    /// Looks up a definition by name.
    pub fn get(&self, name: &str) -> Option<&IndexDef> {
        self.defs.iter().find(|def| def.name == name)
    }

    /// Serving index for `subset`; `None` only for the empty set.
    pub fn coverage(&self, subset: FieldSet) -> Option<Coverage<'_>> {
        let slot = self.table[usize::from(subset.bits())].as_ref()?;
        Some(Coverage {
            index: &self.defs[slot.index],
            order: &slot.order,
        })
    }

    /// Every covered subset with its serving index, ordered by mask value.
    pub fn coverage_table(&self) -> impl Iterator<Item = (FieldSet, Coverage<'_>)> + '_ {
        FieldSet::non_empty_subsets()
            .filter_map(move |subset| self.coverage(subset).map(|cov| (subset, cov)))
    }

    /// Every (index, permutation) pair able to serve `subset`, the chosen one first.
    ///
    /// All candidates retrieve the same statements; they differ only in key layout.
    pub fn candidates(&self, subset: FieldSet) -> Vec<Coverage<'_>> {
        prefix_candidates(&self.defs, subset)
            .into_iter()
            .map(|(index, _)| {
                let def = &self.defs[index];
                Coverage {
                    index: def,
                    order: &def.fields()[..subset.len()],
                }
            })
            .collect()
    }

    /// Index used to enumerate every statement: the one serving fully bound patterns.
    pub fn full_scan_index(&self) -> &IndexDef {
        &self.defs[self.full]
    }

    /// Deterministic hash over names, key layouts and reduces.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        for def in &self.defs {
            hasher.write(def.name.as_bytes());
            hasher.write_u8(0xFF);
            for field in def.fields() {
                hasher.write_u8(field.ordinal() as u8);
            }
            hasher.write_u8(match def.rule.reduce {
                None => 0,
                Some(ReduceRule::Count) => 1,
            });
        }
        hasher.finish()
    }
}

/// `[s,p,o,c]`, `[p,o,c]`, `[o,c]`, `[s,c,o]`, `[c,p,s]`, `[o,s]`, each with a count reduce.
pub fn standard_definitions() -> Vec<IndexDef> {
    use Field::{Context as C, Object as O, Predicate as P, Subject as S};
    [
        ("spoc", vec![S, P, O, C]),
        ("poc", vec![P, O, C]),
        ("oc", vec![O, C]),
        ("sco", vec![S, C, O]),
        ("cps", vec![C, P, S]),
        ("os", vec![O, S]),
    ]
    .into_iter()
    .map(|(name, fields)| IndexDef::new(name, fields).with_reduce(ReduceRule::Count))
    .collect()
}

fn validate_definitions(defs: &[IndexDef]) -> Result<()> {
    if defs.is_empty() {
        return Err(QuadError::Configuration("catalog has no indexes".into()));
    }
    let mut names = FxHashSet::default();
    for def in defs {
        if def.name.is_empty() {
            return Err(QuadError::Configuration("index name is empty".into()));
        }
        if !names.insert(def.name.as_str()) {
            return Err(QuadError::Configuration(format!(
                "duplicate index name '{}'",
                def.name
            )));
        }
        if def.arity() == 0 || def.arity() > Field::ALL.len() {
            return Err(QuadError::Configuration(format!(
                "index '{}' must name between 1 and 4 fields",
                def.name
            )));
        }
        let distinct: FieldSet = def.fields().iter().copied().collect();
        if distinct.len() != def.arity() {
            return Err(QuadError::Configuration(format!(
                "index '{}' repeats a field",
                def.name
            )));
        }
    }
    Ok(())
}

/// Tries each permutation of `subset` (lexicographic over canonical field
/// order) against each index in catalog order, collecting matching prefixes.
fn prefix_candidates(defs: &[IndexDef], subset: FieldSet) -> Vec<(usize, FieldOrder)> {
    let n = subset.len();
    let mut out = Vec::new();
    for perm in permutations(&subset.fields()) {
        for (index, def) in defs.iter().enumerate() {
            if def.arity() >= n && def.fields()[..n] == perm[..] {
                out.push((index, perm.clone()));
            }
        }
    }
    out
}

fn permutations(fields: &[Field]) -> Vec<FieldOrder> {
    if fields.len() <= 1 {
        return vec![fields.iter().copied().collect()];
    }
    let mut out = Vec::new();
    for (idx, head) in fields.iter().enumerate() {
        let mut rest: FieldOrder = fields.iter().copied().collect();
        rest.remove(idx);
        for tail in permutations(&rest) {
            let mut perm = FieldOrder::new();
            perm.push(*head);
            perm.extend(tail);
            out.push(perm);
        }
    }
    out
}
