//! Enumeration types.

/// How the symbols of an enum combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumKind {
    /// Plain enumeration: a value is exactly one symbol.
    Enum,
    /// Flag set: a value is a bitwise combination of symbols.
    Flag,
    /// A free-standing symbol literal such as `$red`, not yet bound to an
    /// enumeration. Symbols carry no meaningful ordering.
    Symbol,
}

/// An enumeration: a name plus its ordered symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub kind: EnumKind,
    pub symbols: Vec<(String, i64)>,
}

impl EnumType {
    /// An enumeration with symbols numbered from zero.
    pub fn new(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: EnumKind::Enum,
            symbols: symbols
                .iter()
                .enumerate()
                .map(|(i, s)| (s.to_string(), i as i64))
                .collect(),
        }
    }

    /// A flag set with one bit per symbol.
    pub fn flags(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: EnumKind::Flag,
            symbols: symbols
                .iter()
                .enumerate()
                .map(|(i, s)| (s.to_string(), 1i64 << i))
                .collect(),
        }
    }

    /// The type of a single symbol literal.
    pub fn symbol(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            name: format!("${symbol}"),
            kind: EnumKind::Symbol,
            symbols: vec![(symbol, 0)],
        }
    }

    /// Value of `symbol` in this enumeration.
    pub fn value_of(&self, symbol: &str) -> Option<i64> {
        self.symbols
            .iter()
            .find(|(name, _)| name == symbol)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.value_of(symbol).is_some()
    }

    /// Symbol name of a value, for enumerations only.
    pub fn symbol_of(&self, value: i64) -> Option<&str> {
        self.symbols
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }
}
