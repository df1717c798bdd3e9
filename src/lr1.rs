//! LR(1) items, closure, GOTO and the canonical collection.

use crate::first_follow::FirstSets;
use crate::grammar::{Grammar, GrammarError, ProductionID, Symbol, Terminal};
use crate::parse_table::{self, Conflict, ParsingTable, TableError};
use crate::util::display_fn;
use indexmap::IndexMap;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// An LR(1) item: a production with a marker position and one lookahead
/// terminal.
///
/// `marker` ranges over `0..=rhs.len()`; `marker == rhs.len()` means the
/// whole body has been recognized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionID,
    pub marker: usize,
    pub lookahead: Terminal,
}

impl Item {
    pub fn display<'g>(&'g self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let production = grammar.production(self.production);
            write!(f, "[{} ->", production.lhs())?;
            for (i, symbol) in production.rhs().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" ·")?;
                }
                write!(f, " {}", symbol)?;
            }
            if self.marker == production.rhs().len() {
                f.write_str(" ·")?;
            }
            write!(f, ", {}]", self.lookahead)
        })
    }
}

/// A set of LR(1) items. Equality and hashing are element-wise, and
/// iteration is ordered by (production, marker, lookahead).
pub type ItemSet = BTreeSet<Item>;

/// Index of a state in a canonical collection, assigned in first-discovery
/// order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: usize,
}

impl StateID {
    /// The start state.
    pub const START: Self = Self::new(0);

    pub(crate) const fn new(raw: usize) -> Self {
        Self { raw }
    }

    pub const fn index(self) -> usize {
        self.raw
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The canonical collection of closed item sets, together with its
/// transition map and the augmented grammar it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSet {
    pub(crate) grammar: Grammar,
    pub(crate) states: Vec<ItemSet>,
    pub(crate) transitions: IndexMap<(StateID, Symbol), StateID>,
}

impl CanonicalSet {
    /// The augmented grammar underlying this collection. Its production 0
    /// is `S' -> S`.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &ItemSet)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, items)| (StateID::new(i), items))
    }

    pub fn state(&self, id: StateID) -> &ItemSet {
        &self.states[id.index()]
    }

    pub fn transition(&self, from: StateID, on: &Symbol) -> Option<StateID> {
        self.transitions.get(&(from, on.clone())).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (StateID, &Symbol, StateID)> + '_ {
        self.transitions
            .iter()
            .map(|((from, symbol), to)| (*from, symbol, *to))
    }
}

impl fmt::Display for CanonicalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, items) in self.states() {
            writeln!(f, "I{}:", id)?;
            for item in items {
                writeln!(f, "  {}", item.display(&self.grammar))?;
            }
            for (from, symbol, to) in self.transitions() {
                if from == id {
                    writeln!(f, "  {} -> I{}", symbol, to)?;
                }
            }
        }
        Ok(())
    }
}

/// The LR(1) closure of `items`.
///
/// This convenience recomputes the FIRST sets of `grammar` on every call;
/// the canonical-set builder shares one [`FirstSets`] across all closures.
pub fn closure(grammar: &Grammar, items: &ItemSet) -> ItemSet {
    let first_sets = FirstSets::new(grammar);
    let mut closed = items.clone();
    close(grammar, &first_sets, &mut closed);
    closed
}

/// `GOTO(items, symbol)`: advance the marker over `symbol` and close the
/// result. Empty when no item has `symbol` after its marker.
pub fn goto(grammar: &Grammar, items: &ItemSet, symbol: &Symbol) -> ItemSet {
    let first_sets = FirstSets::new(grammar);
    goto_with(grammar, &first_sets, items, symbol)
}

fn close(grammar: &Grammar, first_sets: &FirstSets, items: &mut ItemSet) {
    let mut changed = true;
    while changed {
        changed = false;

        let mut added: Vec<Item> = Vec::new();
        for item in items.iter() {
            let production = grammar.production(item.production);

            // [A -> α · B β, a] with B a nonterminal predicts B's
            // productions under First(β a).
            let (b, beta) = match &production.rhs()[item.marker..] {
                [Symbol::N(b), beta @ ..] => (b, beta),
                _ => continue,
            };

            let lookaheads = first_sets.with_lookahead(beta, &item.lookahead);
            for (id, _) in grammar.productions_for(b) {
                for lookahead in &lookaheads {
                    added.push(Item {
                        production: id,
                        marker: 0,
                        lookahead: lookahead.clone(),
                    });
                }
            }
        }

        for item in added {
            changed |= items.insert(item);
        }
    }
}

fn goto_with(
    grammar: &Grammar,
    first_sets: &FirstSets,
    items: &ItemSet,
    symbol: &Symbol,
) -> ItemSet {
    let mut moved = ItemSet::new();
    for item in items {
        let production = grammar.production(item.production);
        if production.rhs().get(item.marker) == Some(symbol) {
            moved.insert(Item {
                marker: item.marker + 1,
                ..item.clone()
            });
        }
    }
    if !moved.is_empty() {
        close(grammar, first_sets, &mut moved);
    }
    moved
}

/// Construct the canonical collection of LR(1) item sets for `grammar`.
///
/// The grammar is augmented first; state 0 is the closure of
/// `[S' -> · S, $]` and further states are numbered as they are
/// discovered. GOTO is probed for every grammar symbol, terminals before
/// nonterminals, each in first-occurrence order, so the numbering is
/// reproducible.
pub fn construct_canonical_set(grammar: &Grammar) -> Result<CanonicalSet, GrammarError> {
    grammar.check_non_empty()?;

    let grammar = grammar.augmented();
    let first_sets = FirstSets::new(&grammar);

    let mut symbols: Vec<Symbol> = grammar.terminals().into_iter().map(Symbol::T).collect();
    symbols.extend(grammar.non_terminals().into_iter().map(Symbol::N));

    let mut start = ItemSet::new();
    start.insert(Item {
        production: ProductionID::new(0),
        marker: 0,
        lookahead: Terminal::EOI,
    });
    close(&grammar, &first_sets, &mut start);

    let mut states: IndexMap<ItemSet, StateID> = IndexMap::new();
    let mut transitions: IndexMap<(StateID, Symbol), StateID> = IndexMap::new();
    let mut queue: VecDeque<(StateID, ItemSet)> = VecDeque::new();

    states.insert(start.clone(), StateID::START);
    queue.push_back((StateID::START, start));

    while let Some((from, items)) = queue.pop_front() {
        for symbol in &symbols {
            let target = goto_with(&grammar, &first_sets, &items, symbol);
            if target.is_empty() {
                continue;
            }

            let to = match states.get(&target) {
                Some(&id) => id,
                None => {
                    let id = StateID::new(states.len());
                    states.insert(target.clone(), id);
                    queue.push_back((id, target));
                    id
                }
            };
            transitions.insert((from, symbol.clone()), to);
        }
    }

    tracing::debug!(states = states.len(), "constructed LR(1) canonical collection");

    Ok(CanonicalSet {
        grammar,
        states: states.into_keys().collect(),
        transitions,
    })
}

/// Construct the LR(1) ACTION/GOTO table. Any conflict makes the whole
/// construction fail, with every conflict collected in the error.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{non_terminals, terminals, NonTerminal, Symbol::{N, T}};
    use crate::parse_table::Action;

    fn parens() -> (Grammar, [NonTerminal; 3], [Terminal; 2]) {
        let nts = non_terminals(["S", "List", "Pair"]);
        let ts = terminals(["(", ")"]);
        let [s, list, pair] = nts.clone();
        let [lp, rp] = ts.clone();

        let mut g = Grammar::new(s.clone());
        g.add_production(s, [N(list.clone())]);
        g.add_production(list.clone(), [N(list.clone()), N(pair.clone())]);
        g.add_production(list, [N(pair.clone())]);
        g.add_production(pair.clone(), [T(lp.clone()), N(pair.clone()), T(rp.clone())]);
        g.add_production(pair, [T(lp), T(rp)]);
        (g, nts, ts)
    }

    #[test]
    fn start_state_is_the_closure_of_the_start_item() {
        let (g, ..) = parens();
        let canonical = construct_canonical_set(&g).unwrap();

        let start = canonical.state(StateID::START);
        assert!(start.contains(&Item {
            production: ProductionID::new(0),
            marker: 0,
            lookahead: Terminal::EOI,
        }));
        // [S -> · List, $] plus the List and Pair predictions under {$, (}.
        assert_eq!(start.len(), 10);
    }

    #[test]
    fn closure_and_goto_agree_with_the_collection() {
        let (g, ..) = parens();
        let aug = g.augmented();

        let mut start = ItemSet::new();
        start.insert(Item {
            production: ProductionID::new(0),
            marker: 0,
            lookahead: Terminal::EOI,
        });
        let closed = closure(&aug, &start);

        let canonical = construct_canonical_set(&g).unwrap();
        assert_eq!(&closed, canonical.state(StateID::START));

        let lp = Symbol::T(Terminal::new("("));
        let target = goto(&aug, &closed, &lp);
        let to = canonical.transition(StateID::START, &lp).unwrap();
        assert_eq!(&target, canonical.state(to));
    }

    #[test]
    fn parentheses_grammar_builds_thirteen_states() {
        let (g, [s, list, _], [lp, _]) = parens();
        let canonical = construct_canonical_set(&g).unwrap();
        assert_eq!(canonical.len(), 13);

        let table = construct_parsing_table(&g).unwrap();
        assert!(matches!(
            table.action(StateID::START, &lp),
            Some(Action::Shift(_))
        ));

        // goto(0, S) accepts on $.
        let after_s = canonical
            .transition(StateID::START, &N(s))
            .unwrap();
        assert_eq!(table.action(after_s, &Terminal::EOI), Some(&Action::Accept));

        // goto(0, List) reduces S -> List on $ and keeps shifting on `(`.
        let after_list = canonical
            .transition(StateID::START, &N(list))
            .unwrap();
        assert_eq!(
            table.action(after_list, &Terminal::EOI),
            Some(&Action::Reduce(ProductionID::new(1)))
        );
        assert!(matches!(
            table.action(after_list, &lp),
            Some(Action::Shift(_))
        ));
    }

    #[test]
    fn empty_production_grammar_has_two_states() {
        let [s] = non_terminals(["S"]);
        let mut g = Grammar::new(s.clone());
        g.add_production(s, []);

        let table = construct_parsing_table(&g).unwrap();
        assert_eq!(table.canonical_set().len(), 2);
        assert_eq!(
            table.action(StateID::START, &Terminal::EOI),
            Some(&Action::Reduce(ProductionID::new(1)))
        );
        assert_eq!(
            table.action(StateID::new(1), &Terminal::EOI),
            Some(&Action::Accept)
        );
    }

    #[test]
    fn construction_is_deterministic() {
        let (g, ..) = parens();
        let first_run = construct_canonical_set(&g).unwrap();
        let second_run = construct_canonical_set(&g).unwrap();
        assert_eq!(first_run, second_run);
    }

    #[test]
    fn reduce_entries_point_at_completed_items() {
        let (g, ..) = parens();
        let table = construct_parsing_table(&g).unwrap();

        for (state, _, action) in table.actions() {
            let Action::Reduce(production) = action else { continue };
            let rhs_len = table.productions()[production.index()].rhs().len();
            assert!(table
                .canonical_set()
                .state(state)
                .iter()
                .any(|item| item.production == *production && item.marker == rhs_len));
        }
    }
}
