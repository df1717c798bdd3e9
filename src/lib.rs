//! Parsing-table construction for context-free grammars.
//!
//! Given a grammar built from name-keyed [`Terminal`] and [`NonTerminal`]
//! symbols, this crate computes the classical predictive and shift-reduce
//! analyses: nullability, FIRST and FOLLOW sets, the LL(1) parsing table,
//! the canonical collection of LR(1) item sets with its ACTION/GOTO table,
//! and the LALR(1) collection and table obtained by merging LR(1) states
//! with identical cores.
//!
//! The crate only produces tables; driving a table over an input stream is
//! left to the caller.
//!
//! ```
//! use gramtab::{non_terminals, terminals, Grammar, Symbol::{N, T}};
//!
//! let [s] = non_terminals(["S"]);
//! let [plus, star, a] = terminals(["+", "*", "a"]);
//!
//! let mut grammar = Grammar::new(s.clone());
//! grammar.add_production(s.clone(), [T(plus), N(s.clone()), N(s.clone())]);
//! grammar.add_production(s.clone(), [T(star), N(s.clone()), N(s.clone())]);
//! grammar.add_production(s.clone(), [T(a)]);
//!
//! let table = gramtab::ll1::construct_parsing_table(&grammar)?;
//! assert!(table.is_ll1());
//!
//! let table = gramtab::lr1::construct_parsing_table(&grammar)?;
//! assert!(!table.productions().is_empty());
//! # Ok::<(), gramtab::TableError>(())
//! ```

pub mod first_follow;
pub mod grammar;
pub mod lalr1;
pub mod ll1;
pub mod lr1;
pub mod parse_table;
mod util;

pub use crate::first_follow::{first, follow, FirstSet, FirstSets, FollowSets};
pub use crate::grammar::{
    non_terminals, terminals, Grammar, GrammarError, NonTerminal, Production, ProductionID,
    Symbol, Terminal, Warning,
};
pub use crate::lr1::{CanonicalSet, Item, ItemSet, StateID};
pub use crate::parse_table::{Action, Conflict, ParsingTable, TableError};
