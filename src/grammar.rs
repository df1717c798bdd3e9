//! Grammar types.

use indexmap::IndexSet;
use std::{borrow::Cow, fmt};

/// A terminal symbol, identified by its display name.
///
/// Two terminals with the same name are the same terminal, regardless of how
/// they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Terminal {
    name: Cow<'static, str>,
}

impl Terminal {
    /// The end-of-input marker, written `$`.
    pub const EOI: Self = Self {
        name: Cow::Borrowed("$"),
    };

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_eoi(&self) -> bool {
        self.name == "$"
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A nonterminal symbol, identified by its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTerminal {
    name: Cow<'static, str>,
}

impl NonTerminal {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Either a terminal or a nonterminal symbol.
///
/// ε is not a symbol. It never occurs on the right-hand side of a production;
/// an empty production body stands for the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    T(Terminal),
    N(NonTerminal),
}

impl Symbol {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::T(..))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::T(t) => t.name(),
            Self::N(n) => n.name(),
        }
    }
}

impl From<Terminal> for Symbol {
    fn from(t: Terminal) -> Self {
        Self::T(t)
    }
}

impl From<NonTerminal> for Symbol {
    fn from(n: NonTerminal) -> Self {
        Self::N(n)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Batch constructor for terminal symbols.
pub fn terminals<const N: usize>(names: [&'static str; N]) -> [Terminal; N] {
    names.map(Terminal::new)
}

/// Batch constructor for nonterminal symbols.
pub fn non_terminals<const N: usize>(names: [&'static str; N]) -> [NonTerminal; N] {
    names.map(NonTerminal::new)
}

/// Index of a production within its grammar.
///
/// Productions are numbered in insertion order. In an augmented grammar the
/// production `S' -> S` has index 0 and every user production is shifted up
/// by one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: usize,
}

impl ProductionID {
    pub const fn new(index: usize) -> Self {
        Self { raw: index }
    }

    pub const fn index(self) -> usize {
        self.raw
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A production rule `lhs -> rhs`. An empty `rhs` derives the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    lhs: NonTerminal,
    rhs: Vec<Symbol>,
}

impl Production {
    pub fn lhs(&self) -> &NonTerminal {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        if self.rhs.is_empty() {
            return f.write_str(" ε");
        }
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// A context-free grammar: a start symbol plus an ordered list of
/// productions.
///
/// The grammar is mutated only through [`Grammar::add_production`]; every
/// analysis borrows it read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    start: NonTerminal,
    productions: Vec<Production>,
}

impl Grammar {
    pub fn new(start: NonTerminal) -> Self {
        Self {
            start,
            productions: Vec::new(),
        }
    }

    /// Append the production `lhs -> rhs`.
    ///
    /// Adding a production that is already present is a no-op, so repeated
    /// insertion is idempotent.
    pub fn add_production<I>(&mut self, lhs: NonTerminal, rhs: I)
    where
        I: IntoIterator<Item = Symbol>,
    {
        let production = Production {
            lhs,
            rhs: rhs.into_iter().collect(),
        };
        if !self.productions.contains(&production) {
            self.productions.push(production);
        }
    }

    pub fn start_symbol(&self) -> &NonTerminal {
        &self.start
    }

    /// All productions, in insertion order.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[id.index()]
    }

    /// The productions whose left-hand side is `nt`, in insertion order.
    pub fn productions_for<'g>(
        &'g self,
        nt: &'g NonTerminal,
    ) -> impl Iterator<Item = (ProductionID, &'g Production)> + 'g {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.lhs == *nt)
            .map(|(i, p)| (ProductionID::new(i), p))
    }

    /// All terminals occurring in production bodies, in first-occurrence
    /// order. The end-of-input marker is not part of the grammar and is not
    /// included.
    pub fn terminals(&self) -> IndexSet<Terminal> {
        let mut terminals = IndexSet::new();
        for production in &self.productions {
            for symbol in &production.rhs {
                if let Symbol::T(t) = symbol {
                    terminals.insert(t.clone());
                }
            }
        }
        terminals
    }

    /// All nonterminals that have at least one production, in
    /// first-occurrence order of their defining productions.
    pub fn non_terminals(&self) -> IndexSet<NonTerminal> {
        self.productions.iter().map(|p| p.lhs.clone()).collect()
    }

    /// Nonterminals that occur in some production body but are never
    /// defined. FIRST and FOLLOW treat these as deriving nothing.
    pub fn undefined_non_terminals(&self) -> IndexSet<NonTerminal> {
        let defined = self.non_terminals();
        let mut undefined = IndexSet::new();
        for production in &self.productions {
            for symbol in &production.rhs {
                if let Symbol::N(n) = symbol {
                    if !defined.contains(n) {
                        undefined.insert(n.clone());
                    }
                }
            }
        }
        undefined
    }

    /// The augmented grammar: a fresh start symbol `S'` with the single
    /// production `S' -> S` prepended at index 0.
    ///
    /// The fresh name is the start name with a prime appended; further
    /// primes are appended while the name is taken (see
    /// [`Grammar::warnings`]).
    pub fn augmented(&self) -> Self {
        let start = self.fresh_start();
        let mut productions = Vec::with_capacity(self.productions.len() + 1);
        productions.push(Production {
            lhs: start.clone(),
            rhs: vec![Symbol::N(self.start.clone())],
        });
        productions.extend(self.productions.iter().cloned());
        Self { start, productions }
    }

    fn known_non_terminal_names(&self) -> IndexSet<&str> {
        let mut names: IndexSet<&str> = IndexSet::new();
        names.insert(self.start.name());
        for production in &self.productions {
            names.insert(production.lhs.name());
            for symbol in &production.rhs {
                if let Symbol::N(n) = symbol {
                    names.insert(n.name());
                }
            }
        }
        names
    }

    fn fresh_start(&self) -> NonTerminal {
        let taken = self.known_non_terminal_names();
        let mut name = format!("{}'", self.start.name());
        while taken.contains(name.as_str()) {
            name.push('\'');
        }
        NonTerminal::new(name)
    }

    /// Non-fatal diagnostics: undefined nonterminals and a start-name
    /// collision with the conventional augmented start.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings: Vec<Warning> = self
            .undefined_non_terminals()
            .into_iter()
            .map(Warning::UndefinedNonTerminal)
            .collect();

        let conventional = format!("{}'", self.start.name());
        if self.known_non_terminal_names().contains(conventional.as_str()) {
            warnings.push(Warning::StartSymbolCollision {
                conventional: NonTerminal::new(conventional),
                renamed: self.fresh_start(),
            });
        }

        warnings
    }

    pub(crate) fn check_non_empty(&self) -> Result<(), GrammarError> {
        if self.productions_for(&self.start).next().is_none() {
            return Err(GrammarError::EmptyGrammar {
                start: self.start.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminals: ")?;
        for (i, t) in self.terminals().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "\nnonterminals: ")?;
        for (i, n) in self.non_terminals().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", n)?;
        }
        writeln!(f, "\nstart: {}", self.start)?;
        writeln!(f, "productions:")?;
        for (i, production) in self.productions.iter().enumerate() {
            writeln!(f, "  [{:02}] {}", i, production)?;
        }
        Ok(())
    }
}

/// Fatal grammar defects, detected before any analysis runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("the start symbol `{start}` has no production")]
    EmptyGrammar { start: NonTerminal },
}

/// Non-fatal grammar diagnostics reported by [`Grammar::warnings`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("nonterminal `{0}` is used but never defined")]
    UndefinedNonTerminal(NonTerminal),

    #[error("`{conventional}` is already taken, the augmented start is named `{renamed}`")]
    StartSymbolCollision {
        conventional: NonTerminal,
        renamed: NonTerminal,
    },
}
