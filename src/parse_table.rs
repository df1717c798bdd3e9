//! ACTION/GOTO table assembly from a canonical collection.

use crate::grammar::{GrammarError, NonTerminal, Production, ProductionID, Symbol, Terminal};
use crate::lr1::{CanonicalSet, ItemSet, StateID};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::fmt;

/// One ACTION cell of a shift-reduce parsing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Consume the lookahead and move to the given state.
    Shift(StateID),
    /// Reduce by the given production of the augmented grammar.
    Reduce(ProductionID),
    /// The input is a complete sentence.
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(state) => write!(f, "shift({})", state),
            Self::Reduce(production) => write!(f, "reduce({})", production),
            Self::Accept => f.write_str("accept"),
        }
    }
}

/// An ACTION cell that was assigned two distinct entries.
///
/// Accept is reported as a reduction by production 0, the augmented start
/// production.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Conflict {
    #[error("shift/reduce conflict in state {state} on `{symbol}`: shift({shift}) vs reduce({reduce})")]
    ShiftReduce {
        state: StateID,
        symbol: Terminal,
        shift: StateID,
        reduce: ProductionID,
    },

    #[error("reduce/reduce conflict in state {state} on `{symbol}`: reduce({first}) vs reduce({second})")]
    ReduceReduce {
        state: StateID,
        symbol: Terminal,
        first: ProductionID,
        second: ProductionID,
    },
}

/// Table construction failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("{} conflict(s) detected in the ACTION table", .0.len())]
    Conflicts(Vec<Conflict>),
}

/// A shift-reduce parsing table together with the canonical collection it
/// was derived from.
///
/// `action` and `goto` are partial maps; a missing entry means a syntax
/// error. Reduce entries index into [`ParsingTable::productions`], the
/// production list of the augmented grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingTable {
    canonical: CanonicalSet,
    action: IndexMap<(StateID, Terminal), Action>,
    goto: IndexMap<(StateID, NonTerminal), StateID>,
}

impl ParsingTable {
    pub fn canonical_set(&self) -> &CanonicalSet {
        &self.canonical
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &ItemSet)> + '_ {
        self.canonical.states()
    }

    /// The productions of the augmented grammar, `S' -> S` first.
    pub fn productions(&self) -> &[Production] {
        self.canonical.grammar().productions()
    }

    pub fn action(&self, state: StateID, lookahead: &Terminal) -> Option<&Action> {
        self.action.get(&(state, lookahead.clone()))
    }

    pub fn actions(&self) -> impl Iterator<Item = (StateID, &Terminal, &Action)> + '_ {
        self.action
            .iter()
            .map(|((state, terminal), action)| (*state, terminal, action))
    }

    pub fn goto(&self, state: StateID, nt: &NonTerminal) -> Option<StateID> {
        self.goto.get(&(state, nt.clone())).copied()
    }

    pub fn gotos(&self) -> impl Iterator<Item = (StateID, &NonTerminal, StateID)> + '_ {
        self.goto
            .iter()
            .map(|((state, nt), target)| (*state, nt, *target))
    }
}

impl fmt::Display for ParsingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grammar = self.canonical.grammar();
        for (id, items) in self.canonical.states() {
            writeln!(f, "#### State {:02}", id)?;
            for item in items {
                writeln!(f, "- {}", item.display(grammar))?;
            }
            for (state, terminal, action) in self.actions() {
                if state == id {
                    writeln!(f, "- {} => {}", terminal, action)?;
                }
            }
            for (state, nt, target) in self.gotos() {
                if state == id {
                    writeln!(f, "- {} => goto({})", nt, target)?;
                }
            }
        }
        Ok(())
    }
}

/// Fill ACTION and GOTO from a canonical collection.
///
/// A contested cell keeps its first entry and the collision is recorded,
/// so the conflict list preserves (state, item) discovery order.
pub(crate) fn build(canonical: CanonicalSet) -> (ParsingTable, Vec<Conflict>) {
    let start_production = ProductionID::new(0);

    let mut action: IndexMap<(StateID, Terminal), Action> = IndexMap::new();
    let mut goto: IndexMap<(StateID, NonTerminal), StateID> = IndexMap::new();
    let mut conflicts: Vec<Conflict> = Vec::new();

    for (state, items) in canonical.states() {
        for item in items {
            let production = canonical.grammar().production(item.production);
            match production.rhs().get(item.marker) {
                Some(symbol @ Symbol::T(t)) => {
                    let target = canonical
                        .transition(state, symbol)
                        .expect("closed states record a transition for every shiftable terminal");
                    insert_action(
                        &mut action,
                        &mut conflicts,
                        state,
                        t.clone(),
                        Action::Shift(target),
                    );
                }
                Some(symbol @ Symbol::N(n)) => {
                    // An undefined nonterminal after the marker has no
                    // transition; the cell is simply left empty.
                    if let Some(target) = canonical.transition(state, symbol) {
                        goto.insert((state, n.clone()), target);
                    }
                }
                None => {
                    if item.production == start_production {
                        insert_action(
                            &mut action,
                            &mut conflicts,
                            state,
                            Terminal::EOI,
                            Action::Accept,
                        );
                    } else {
                        insert_action(
                            &mut action,
                            &mut conflicts,
                            state,
                            item.lookahead.clone(),
                            Action::Reduce(item.production),
                        );
                    }
                }
            }
        }
    }

    tracing::debug!(
        actions = action.len(),
        gotos = goto.len(),
        conflicts = conflicts.len(),
        "assembled ACTION/GOTO table"
    );

    (
        ParsingTable {
            canonical,
            action,
            goto,
        },
        conflicts,
    )
}

fn insert_action(
    action: &mut IndexMap<(StateID, Terminal), Action>,
    conflicts: &mut Vec<Conflict>,
    state: StateID,
    symbol: Terminal,
    entry: Action,
) {
    match action.entry((state, symbol)) {
        Entry::Vacant(vacant) => {
            vacant.insert(entry);
        }
        Entry::Occupied(occupied) => {
            if *occupied.get() != entry {
                let symbol = occupied.key().1.clone();
                conflicts.push(classify(state, symbol, occupied.get(), &entry));
            }
        }
    }
}

fn classify(state: StateID, symbol: Terminal, existing: &Action, incoming: &Action) -> Conflict {
    let start_production = ProductionID::new(0);
    match (existing, incoming) {
        (Action::Shift(shift), Action::Reduce(reduce))
        | (Action::Reduce(reduce), Action::Shift(shift)) => Conflict::ShiftReduce {
            state,
            symbol,
            shift: *shift,
            reduce: *reduce,
        },
        (Action::Shift(shift), Action::Accept) | (Action::Accept, Action::Shift(shift)) => {
            Conflict::ShiftReduce {
                state,
                symbol,
                shift: *shift,
                reduce: start_production,
            }
        }
        (Action::Reduce(first), Action::Reduce(second)) => Conflict::ReduceReduce {
            state,
            symbol,
            first: *first,
            second: *second,
        },
        (Action::Accept, Action::Reduce(second)) => Conflict::ReduceReduce {
            state,
            symbol,
            first: start_production,
            second: *second,
        },
        (Action::Reduce(first), Action::Accept) => Conflict::ReduceReduce {
            state,
            symbol,
            first: *first,
            second: start_production,
        },
        (Action::Shift(..), Action::Shift(..)) | (Action::Accept, Action::Accept) => {
            unreachable!("identical cell entries are filtered before classification")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{non_terminals, terminals, Grammar, Symbol::{N, T}};
    use crate::lr1;

    #[test]
    fn shift_reduce_conflict_is_reported() {
        // S -> A a, A -> a | ε: state 0 must both shift `a` and reduce
        // A -> ε on `a`.
        let [s, a_nt] = non_terminals(["S", "A"]);
        let [a] = terminals(["a"]);

        let mut g = Grammar::new(s.clone());
        g.add_production(s, [N(a_nt.clone()), T(a.clone())]);
        g.add_production(a_nt.clone(), [T(a.clone())]);
        g.add_production(a_nt, []);

        let err = lr1::construct_parsing_table(&g).unwrap_err();
        let TableError::Conflicts(conflicts) = err else {
            panic!("expected conflicts");
        };
        assert!(conflicts
            .iter()
            .all(|c| matches!(c, Conflict::ShiftReduce { symbol, .. } if *symbol == a)));

        // The permissive variant still returns a table.
        let (table, conflicts) = lr1::construct_parsing_table_with_conflicts(&g).unwrap();
        assert!(!conflicts.is_empty());
        assert!(table.action(StateID::START, &a).is_some());
    }

    #[test]
    fn conflict_messages_name_state_and_symbol() {
        let conflict = Conflict::ReduceReduce {
            state: StateID::new(4),
            symbol: Terminal::new("d"),
            first: ProductionID::new(5),
            second: ProductionID::new(6),
        };
        assert_eq!(
            conflict.to_string(),
            "reduce/reduce conflict in state 4 on `d`: reduce(5) vs reduce(6)"
        );
    }
}
