//! LALR(1) construction by merging LR(1) states with identical cores.

use crate::grammar::{Grammar, GrammarError, ProductionID, Symbol};
use crate::lr1::{self, CanonicalSet, ItemSet, StateID};
use crate::parse_table::{self, Conflict, ParsingTable, TableError};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// The core of an item set: its (production, marker) pairs with the
/// lookaheads discarded.
type Core = BTreeSet<(ProductionID, usize)>;

fn core_of(items: &ItemSet) -> Core {
    items
        .iter()
        .map(|item| (item.production, item.marker))
        .collect()
}

/// Construct the LALR(1) collection: the LR(1) canonical collection with
/// all states of a common core merged into one.
///
/// Merged states take the union of the lookaheads of their constituents.
/// States are renumbered by first occurrence of their core, so the start
/// state keeps index 0.
pub fn construct_canonical_set(grammar: &Grammar) -> Result<CanonicalSet, GrammarError> {
    let lr1 = lr1::construct_canonical_set(grammar)?;
    Ok(merge_cores(lr1))
}

fn merge_cores(lr1: CanonicalSet) -> CanonicalSet {
    let mut merged_ids: IndexMap<Core, StateID> = IndexMap::new();
    let mut merged_states: Vec<ItemSet> = Vec::new();
    let mut remap: Vec<StateID> = Vec::with_capacity(lr1.len());

    for (_, items) in lr1.states() {
        match merged_ids.entry(core_of(items)) {
            Entry::Occupied(occupied) => {
                let id = *occupied.get();
                merged_states[id.index()].extend(items.iter().cloned());
                remap.push(id);
            }
            Entry::Vacant(vacant) => {
                let id = StateID::new(merged_states.len());
                vacant.insert(id);
                merged_states.push(items.clone());
                remap.push(id);
            }
        }
    }

    // States with a common core have the same outgoing transitions on
    // every symbol, so the re-projection cannot disagree.
    let mut transitions: IndexMap<(StateID, Symbol), StateID> = IndexMap::new();
    for (from, symbol, to) in lr1.transitions() {
        let from = remap[from.index()];
        let to = remap[to.index()];
        let previous = transitions.insert((from, symbol.clone()), to);
        debug_assert!(
            previous.map_or(true, |previous| previous == to),
            "merged states must agree on their outgoing transitions"
        );
    }

    tracing::debug!(
        lr1_states = lr1.len(),
        lalr1_states = merged_states.len(),
        "merged LR(1) states by core"
    );

    let CanonicalSet { grammar, .. } = lr1;
    CanonicalSet {
        grammar,
        states: merged_states,
        transitions,
    }
}

/// Construct the LALR(1) ACTION/GOTO table. Any conflict makes the whole
/// construction fail, with every conflict collected in the error.
///
/// Reduce/reduce conflicts can appear here that the LR(1) table does not
/// have; the shift/reduce conflicts are the same in both.
pub fn construct_parsing_table(grammar: &Grammar) -> Result<ParsingTable, TableError> {
    let canonical = construct_canonical_set(grammar)?;
    let (table, conflicts) = parse_table::build(canonical);
    if !conflicts.is_empty() {
        return Err(TableError::Conflicts(conflicts));
    }
    Ok(table)
}

/// Permissive variant of [`construct_parsing_table`]: the first entry of a
/// contested cell wins and all conflicts are reported alongside the table.
pub fn construct_parsing_table_with_conflicts(
    grammar: &Grammar,
) -> Result<(ParsingTable, Vec<Conflict>), GrammarError> {
    let canonical = construct_canonical_set(grammar)?;
    Ok(parse_table::build(canonical))
}
