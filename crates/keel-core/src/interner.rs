// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Name-spaced string interner.
//!
//! Simulation code refers to entity types, components, fields, and clients by
//! compact positive integers; the strings behind them are only resolved by
//! render/debug collaborators. The interner's full state is part of every
//! snapshot, so identifiers agree across peers after a restore.
//!
//! Identifiers are assigned sequentially from 1 in interning order; two
//! participants that intern the same strings in the same order hold identical
//! tables, which the lockstep contract requires anyway.

use core::num::NonZeroU32;

use rustc_hash::FxHashMap;

/// Interner namespace. Keeps identically spelled strings in different roles
/// from colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Entity type names.
    EntityType,
    /// Component names.
    Component,
    /// Field names.
    Field,
    /// Client identifiers.
    Client,
}

impl Namespace {
    /// Stable wire code for snapshot serialisation.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::EntityType => 0,
            Self::Component => 1,
            Self::Field => 2,
            Self::Client => 3,
        }
    }

    /// Inverse of [`Namespace::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::EntityType),
            1 => Some(Self::Component),
            2 => Some(Self::Field),
            3 => Some(Self::Client),
            _ => None,
        }
    }
}

/// Compact interned-string identifier (positive, never zero).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(NonZeroU32);

impl Sym {
    /// Constructs a symbol from its raw positive value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns the raw positive value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.get()
    }
}

/// Bidirectional `(namespace, string) ↔ Sym` map.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    forward: FxHashMap<(Namespace, String), Sym>,
    /// Reverse table indexed by `sym.raw() - 1`.
    reverse: Vec<(Namespace, String)>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string, returning its existing symbol when already present.
    pub fn intern(&mut self, namespace: Namespace, value: &str) -> Sym {
        if let Some(&sym) = self.forward.get(&(namespace, value.to_owned())) {
            return sym;
        }
        self.reverse.push((namespace, value.to_owned()));
        let raw = self.reverse.len() as u32;
        // Length is at least 1 after the push.
        let sym = Sym(NonZeroU32::MIN.saturating_add(raw - 1));
        self.forward.insert((namespace, value.to_owned()), sym);
        sym
    }

    /// Looks up an already interned string without interning it.
    #[must_use]
    pub fn lookup(&self, namespace: Namespace, value: &str) -> Option<Sym> {
        self.forward.get(&(namespace, value.to_owned())).copied()
    }

    /// Resolves a symbol back to its namespace and string.
    ///
    /// Render/debug collaborators only; simulation code never needs the
    /// original string.
    #[must_use]
    pub fn resolve(&self, sym: Sym) -> Option<(Namespace, &str)> {
        self.reverse
            .get(sym.raw() as usize - 1)
            .map(|(ns, s)| (*ns, s.as_str()))
    }

    /// Number of interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    /// Returns `true` when nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Exports the full state in symbol order for snapshot inclusion.
    #[must_use]
    pub fn export(&self) -> Vec<(u8, String)> {
        self.reverse
            .iter()
            .map(|(ns, s)| (ns.code(), s.clone()))
            .collect()
    }

    /// Replaces the full state from a snapshot export.
    ///
    /// Every entry keeps its slot so symbol values stay aligned with the
    /// exporting peer; an unknown namespace code falls back to `Client`
    /// rather than shifting the numbering.
    pub fn restore(&mut self, entries: &[(u8, String)]) {
        self.forward.clear();
        self.reverse.clear();
        for (code, value) in entries {
            let ns = Namespace::from_code(*code).unwrap_or(Namespace::Client);
            self.reverse.push((ns, value.clone()));
            let sym = Sym(NonZeroU32::MIN.saturating_add(self.reverse.len() as u32 - 1));
            self.forward.insert((ns, value.clone()), sym);
        }
    }
}
