//! Nullable, FIRST and FOLLOW set computation.
//!
//! All three are least fixed points: each sweep visits the productions in
//! insertion order and the loop stops when a full sweep changes nothing.

use crate::grammar::{Grammar, NonTerminal, Symbol, Terminal};
use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// The FIRST set of a symbol or a sequence of symbols.
///
/// ε membership is carried as a flag next to the terminal set, so ε can
/// never leak into productions, items or tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSet {
    tokens: IndexSet<Terminal>,
    nullable: bool,
}

impl FirstSet {
    pub fn terminals(&self) -> &IndexSet<Terminal> {
        &self.tokens
    }

    pub fn contains(&self, terminal: &Terminal) -> bool {
        self.tokens.contains(terminal)
    }

    /// Whether ε is a member, i.e. the queried sequence is nullable.
    pub fn contains_epsilon(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for FirstSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, t) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", t)?;
        }
        if self.nullable {
            if !self.tokens.is_empty() {
                f.write_str(", ")?;
            }
            f.write_str("ε")?;
        }
        f.write_str("}")
    }
}

/// Precomputed FIRST sets for every symbol of a grammar.
#[derive(Debug)]
pub struct FirstSets {
    nulls: IndexSet<NonTerminal>,
    map: IndexMap<Symbol, IndexSet<Terminal>>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let nulls = nulls_set(grammar);

        let mut map: IndexMap<Symbol, IndexSet<Terminal>> = IndexMap::new();

        // First(t) = {t} for every terminal.
        for t in grammar.terminals() {
            map.insert(Symbol::T(t.clone()), IndexSet::from([t]));
        }
        for n in grammar.non_terminals() {
            map.insert(Symbol::N(n), IndexSet::new());
        }
        // Undefined nonterminals derive nothing; their sets stay empty.
        for n in grammar.undefined_non_terminals() {
            map.insert(Symbol::N(n), IndexSet::new());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions() {
                let mut added: Vec<Terminal> = Vec::new();
                for symbol in production.rhs() {
                    if let Some(tokens) = map.get(symbol) {
                        added.extend(tokens.iter().cloned());
                    }
                    if !is_nullable(&nulls, symbol) {
                        break;
                    }
                }

                let lhs = map
                    .get_mut(&Symbol::N(production.lhs().clone()))
                    .expect("every defined nonterminal has a FIRST entry");
                for t in added {
                    changed |= lhs.insert(t);
                }
            }
        }

        Self { nulls, map }
    }

    /// Whether the symbol derives the empty string. Terminals never do.
    pub fn nullable(&self, symbol: &Symbol) -> bool {
        is_nullable(&self.nulls, symbol)
    }

    /// `First(Y1 .. Yk)`. The empty sequence yields `{ε}`.
    pub fn of_sequence(&self, symbols: &[Symbol]) -> FirstSet {
        let mut tokens = IndexSet::new();
        let mut nullable = true;
        for symbol in symbols {
            if let Some(added) = self.map.get(symbol) {
                tokens.extend(added.iter().cloned());
            }
            if !self.nullable(symbol) {
                nullable = false;
                break;
            }
        }
        FirstSet { tokens, nullable }
    }

    /// `First(β a)`: the sequence `β` with the terminal `a` as its tail, so
    /// `a` shows through exactly when `β` is nullable.
    pub(crate) fn with_lookahead(&self, beta: &[Symbol], a: &Terminal) -> IndexSet<Terminal> {
        let first = self.of_sequence(beta);
        let mut tokens = first.tokens;
        if first.nullable {
            tokens.insert(a.clone());
        }
        tokens
    }
}

fn is_nullable(nulls: &IndexSet<NonTerminal>, symbol: &Symbol) -> bool {
    matches!(symbol, Symbol::N(n) if nulls.contains(n))
}

/// The set of nullable nonterminals of the grammar.
fn nulls_set(grammar: &Grammar) -> IndexSet<NonTerminal> {
    // Seed with the nonterminals that have an empty production.
    let mut nulls: IndexSet<NonTerminal> = grammar
        .productions()
        .iter()
        .filter(|p| p.rhs().is_empty())
        .map(|p| p.lhs().clone())
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions() {
            if nulls.contains(production.lhs()) {
                continue;
            }
            let rhs_nullable = production
                .rhs()
                .iter()
                .all(|symbol| is_nullable(&nulls, symbol));
            if rhs_nullable {
                changed = true;
                nulls.insert(production.lhs().clone());
            }
        }
    }

    nulls
}

/// Precomputed FOLLOW sets for every defined nonterminal of a grammar.
///
/// FOLLOW sets contain terminals only, possibly including `$`; ε cannot
/// occur by construction.
#[derive(Debug)]
pub struct FollowSets {
    map: IndexMap<NonTerminal, IndexSet<Terminal>>,
}

impl FollowSets {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let mut map: IndexMap<NonTerminal, IndexSet<Terminal>> = IndexMap::new();
        for n in grammar.non_terminals() {
            map.insert(n, IndexSet::new());
        }
        for n in grammar.undefined_non_terminals() {
            map.insert(n, IndexSet::new());
        }
        map.entry(grammar.start_symbol().clone())
            .or_default()
            .insert(Terminal::EOI);

        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions() {
                for (i, symbol) in production.rhs().iter().enumerate() {
                    let Symbol::N(n) = symbol else { continue };

                    let beta = &production.rhs()[i + 1..];
                    let first = first_sets.of_sequence(beta);

                    let mut added: Vec<Terminal> = first.terminals().iter().cloned().collect();
                    if first.contains_epsilon() {
                        // n can end a derivation of the lhs, so everything
                        // following the lhs follows n as well.
                        if let Some(lhs_follow) = map.get(production.lhs()) {
                            added.extend(lhs_follow.iter().cloned());
                        }
                    }

                    let follow = map
                        .get_mut(n)
                        .expect("every known nonterminal has a FOLLOW entry");
                    for t in added {
                        changed |= follow.insert(t);
                    }
                }
            }
        }

        Self { map }
    }

    pub fn get(&self, nt: &NonTerminal) -> Option<&IndexSet<Terminal>> {
        self.map.get(nt)
    }
}

/// One-shot `FIRST` of a symbol sequence. For repeated queries build a
/// [`FirstSets`] once and reuse it.
pub fn first(symbols: &[Symbol], grammar: &Grammar) -> FirstSet {
    FirstSets::new(grammar).of_sequence(symbols)
}

/// One-shot `FOLLOW` of a nonterminal. Unknown nonterminals yield the
/// empty set.
pub fn follow(nt: &NonTerminal, grammar: &Grammar) -> IndexSet<Terminal> {
    let first_sets = FirstSets::new(grammar);
    FollowSets::new(grammar, &first_sets)
        .get(nt)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{non_terminals, terminals, Symbol::{N, T}};

    // The arithmetic expression grammar, left recursion included.
    fn expr() -> (Grammar, [NonTerminal; 3], [Terminal; 7]) {
        let nts = non_terminals(["Expr", "Term", "Factor"]);
        let ts = terminals(["+", "-", "*", "/", "num", "(", ")"]);
        let [expr, term, factor] = nts.clone();
        let [plus, minus, times, div, num, lp, rp] = ts.clone();

        let mut g = Grammar::new(expr.clone());
        g.add_production(expr.clone(), [N(expr.clone()), T(plus), N(term.clone())]);
        g.add_production(expr.clone(), [N(expr.clone()), T(minus), N(term.clone())]);
        g.add_production(expr.clone(), [N(term.clone())]);
        g.add_production(term.clone(), [N(term.clone()), T(times), N(factor.clone())]);
        g.add_production(term.clone(), [N(expr.clone()), T(div), N(term.clone())]);
        g.add_production(term, [N(factor.clone())]);
        g.add_production(factor.clone(), [T(num)]);
        g.add_production(factor, [T(lp), N(expr), T(rp)]);
        (g, nts, ts)
    }

    #[test]
    fn first_of_expression_grammar() {
        let (g, [expr, term, factor], [_, _, _, _, num, lp, _]) = expr();

        let expected = IndexSet::from([num, lp]);
        for nt in [expr, term, factor] {
            let first = first(&[N(nt)], &g);
            assert_eq!(first.terminals(), &expected);
            assert!(!first.contains_epsilon());
        }
    }

    #[test]
    fn follow_of_expression_grammar() {
        let (g, [expr, term, _], [plus, minus, times, div, _, _, rp]) = expr();

        assert_eq!(
            follow(&expr, &g),
            IndexSet::from([Terminal::EOI, plus.clone(), minus.clone(), div.clone(), rp.clone()]),
        );
        assert_eq!(
            follow(&term, &g),
            IndexSet::from([Terminal::EOI, plus, minus, div, rp, times]),
        );
    }

    #[test]
    fn epsilon_membership_tracks_nullability() {
        let [s, a, b] = non_terminals(["S", "A", "B"]);
        let [x, y] = terminals(["x", "y"]);

        let mut g = Grammar::new(s.clone());
        g.add_production(s.clone(), [N(a.clone()), N(b.clone())]);
        g.add_production(a.clone(), []);
        g.add_production(a.clone(), [T(x.clone())]);
        g.add_production(b.clone(), [T(y.clone())]);

        let first_sets = FirstSets::new(&g);
        for nt in [&s, &a, &b] {
            let symbol = N(nt.clone());
            assert_eq!(
                first_sets.of_sequence(&[symbol.clone()]).contains_epsilon(),
                first_sets.nullable(&symbol),
            );
        }
        assert!(first_sets.nullable(&N(a.clone())));
        assert!(!first_sets.nullable(&N(b.clone())));
        assert!(!first_sets.nullable(&N(s)));

        // A is nullable, so First(A B) sees through to B.
        assert_eq!(
            first_sets.of_sequence(&[N(a), N(b)]).terminals(),
            &IndexSet::from([x, y]),
        );
    }

    #[test]
    fn empty_sequence_is_epsilon() {
        let (g, ..) = expr();
        let first = first(&[], &g);
        assert!(first.terminals().is_empty());
        assert!(first.contains_epsilon());
    }

    #[test]
    fn undefined_non_terminal_degrades_to_empty() {
        let [s, x] = non_terminals(["S", "X"]);
        let [a] = terminals(["a"]);

        let mut g = Grammar::new(s.clone());
        g.add_production(s.clone(), [N(x.clone()), T(a.clone())]);

        let first_x = first(&[N(x.clone())], &g);
        assert!(first_x.terminals().is_empty());
        assert!(!first_x.contains_epsilon());

        // X blocks the sweep, so S derives no first terminal either.
        assert!(first(&[N(s)], &g).terminals().is_empty());
        assert_eq!(follow(&x, &g), IndexSet::from([a]));
    }
}
