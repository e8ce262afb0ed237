//! Collection aliases shared by the analyses.
//!
//! Every table is insertion ordered so that iterating it never depends on
//! hash seeds; output and state numbering stay reproducible across runs.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;
