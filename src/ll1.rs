//! LL(1) parsing table construction.

use crate::first_follow::{FirstSets, FollowSets};
use crate::grammar::{Grammar, GrammarError, NonTerminal, ProductionID, Terminal};
use crate::util::display_fn;
use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// The predictive parsing table.
///
/// Cells are keyed by `(nonterminal, lookahead terminal)` and hold the set
/// of candidate productions; absent cells mean a syntax error. A cell with
/// more than one production is an LL(1) conflict, but the table is returned
/// intact so callers can inspect every cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1Table {
    cells: IndexMap<(NonTerminal, Terminal), IndexSet<ProductionID>>,
}

impl Ll1Table {
    pub fn get(&self, nt: &NonTerminal, lookahead: &Terminal) -> Option<&IndexSet<ProductionID>> {
        self.cells.get(&(nt.clone(), lookahead.clone()))
    }

    pub fn cells(
        &self,
    ) -> impl Iterator<Item = (&NonTerminal, &Terminal, &IndexSet<ProductionID>)> + '_ {
        self.cells.iter().map(|((nt, t), ps)| (nt, t, ps))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every cell holding more than one production, in table order.
    pub fn conflicts(&self) -> Vec<Ll1Conflict> {
        self.cells
            .iter()
            .filter(|(_, productions)| productions.len() > 1)
            .map(|((nt, t), productions)| Ll1Conflict {
                non_terminal: nt.clone(),
                terminal: t.clone(),
                productions: productions.iter().copied().collect(),
            })
            .collect()
    }

    pub fn is_ll1(&self) -> bool {
        self.cells.values().all(|productions| productions.len() <= 1)
    }

    pub fn display<'g>(&'g self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for ((nt, t), productions) in &self.cells {
                write!(f, "M[{}, {}] =", nt, t)?;
                for (i, id) in productions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " |")?;
                    }
                    write!(f, " {}", grammar.production(*id))?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

/// A multiply-assigned LL(1) cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1Conflict {
    pub non_terminal: NonTerminal,
    pub terminal: Terminal,
    pub productions: Vec<ProductionID>,
}

impl fmt::Display for Ll1Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LL(1) conflict at ({}, {}): {} candidate productions",
            self.non_terminal,
            self.terminal,
            self.productions.len(),
        )
    }
}

/// Construct the LL(1) parsing table of `grammar`.
///
/// For each production `A -> α`, the production is placed at `(A, a)` for
/// every terminal `a` in `First(α)`, and additionally at `(A, b)` for every
/// `b` in `Follow(A)` when α is nullable.
pub fn construct_parsing_table(grammar: &Grammar) -> Result<Ll1Table, GrammarError> {
    grammar.check_non_empty()?;

    let first_sets = FirstSets::new(grammar);
    let follow_sets = FollowSets::new(grammar, &first_sets);

    let mut cells: IndexMap<(NonTerminal, Terminal), IndexSet<ProductionID>> = IndexMap::new();
    for (i, production) in grammar.productions().iter().enumerate() {
        let id = ProductionID::new(i);
        let first = first_sets.of_sequence(production.rhs());

        for a in first.terminals() {
            cells
                .entry((production.lhs().clone(), a.clone()))
                .or_default()
                .insert(id);
        }

        if first.contains_epsilon() {
            let follow = follow_sets
                .get(production.lhs())
                .expect("every defined nonterminal has a FOLLOW entry");
            for b in follow {
                cells
                    .entry((production.lhs().clone(), b.clone()))
                    .or_default()
                    .insert(id);
            }
        }
    }

    let table = Ll1Table { cells };
    tracing::debug!(
        cells = table.len(),
        conflicts = table.conflicts().len(),
        "constructed LL(1) table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{non_terminals, terminals, Symbol::{N, T}};

    #[test]
    fn prefix_grammar_is_ll1() {
        let [s] = non_terminals(["S"]);
        let [plus, star, a] = terminals(["+", "*", "a"]);

        let mut g = Grammar::new(s.clone());
        g.add_production(s.clone(), [T(plus.clone()), N(s.clone()), N(s.clone())]);
        g.add_production(s.clone(), [T(star.clone()), N(s.clone()), N(s.clone())]);
        g.add_production(s.clone(), [T(a.clone())]);

        let table = construct_parsing_table(&g).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.is_ll1());
        assert!(table.conflicts().is_empty());

        for (t, expected) in [(plus, 0), (star, 1), (a, 2)] {
            let cell = table.get(&s, &t).unwrap();
            let ids: Vec<usize> = cell.iter().map(|id| id.index()).collect();
            assert_eq!(ids, vec![expected]);
        }
    }

    #[test]
    fn nullable_start_lands_on_eoi() {
        let [s] = non_terminals(["S"]);

        let mut g = Grammar::new(s.clone());
        g.add_production(s.clone(), []);

        let table = construct_parsing_table(&g).unwrap();
        assert_eq!(table.len(), 1);
        let cell = table.get(&s, &Terminal::EOI).unwrap();
        assert_eq!(cell.iter().map(|id| id.index()).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn left_recursion_conflicts_but_table_is_returned() {
        let [s, list, pair] = non_terminals(["S", "List", "Pair"]);
        let [lp, rp] = terminals(["(", ")"]);

        let mut g = Grammar::new(s.clone());
        g.add_production(s, [N(list.clone())]);
        g.add_production(list.clone(), [N(list.clone()), N(pair.clone())]);
        g.add_production(list.clone(), [N(pair.clone())]);
        g.add_production(pair.clone(), [T(lp.clone()), N(pair.clone()), T(rp.clone())]);
        g.add_production(pair, [T(lp.clone()), T(rp)]);

        let table = construct_parsing_table(&g).unwrap();
        assert!(!table.is_ll1());

        // Both List productions start with `(`.
        let cell = table.get(&list, &lp).unwrap();
        assert_eq!(
            cell.iter().map(|id| id.index()).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn empty_grammar_is_fatal() {
        let [s] = non_terminals(["S"]);
        let g = Grammar::new(s);
        assert!(matches!(
            construct_parsing_table(&g),
            Err(GrammarError::EmptyGrammar { .. })
        ));
    }
}
