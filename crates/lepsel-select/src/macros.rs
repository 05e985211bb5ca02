//! Textual function-call macros.
//!
//! A macro `NAME → expansion` rewrites every call `NAME(args)` into
//! `expansion(args)`. Names match whole identifiers only, so `NONEMPTY(..)`
//! is never mistaken for `EMPTY(..)`. The argument list is captured up to
//! the first `)`; a macro call nested inside another macro's arguments is
//! left as written by [`MacroExpander::expand`] and needs
//! [`MacroExpander::expand_fixed_point`].

use std::collections::BTreeMap;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

/// Aliases registered by [`MacroExpander::with_defaults`].
pub const DEFAULT_MACROS: &[(&str, &str)] = &[
    ("MAX", "ROOT::VecOps::Max"),
    ("MIN", "ROOT::VecOps::Min"),
    ("SUM", "ROOT::VecOps::Sum"),
    ("MEAN", "ROOT::VecOps::Mean"),
    ("STDDEV", "ROOT::VecOps::StdDev"),
    ("SIZE", "ROOT::VecOps::Size"),
    ("EMPTY", "ROOT::VecOps::Empty"),
    ("NONEMPTY", "!ROOT::VecOps::Empty"),
    ("FRONT", "ROOT::VecOps::Front"),
    ("BACK", "ROOT::VecOps::Back"),
    ("SORT", "ROOT::VecOps::Sort"),
    ("REVERSE", "ROOT::VecOps::Reverse"),
    ("DELTA_PHI", "ROOT::VecOps::DeltaPhi"),
];

/// Registered macro table.
///
/// Registration takes `&mut self` and expansion `&self`, so a table that is
/// set up once can be shared by any number of readers.
#[derive(Debug, Clone, Default)]
pub struct MacroExpander {
    macros: BTreeMap<String, String>,
    pattern: Option<Regex>,
}

impl MacroExpander {
    /// An empty table; [`expand`](Self::expand) is the identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding [`DEFAULT_MACROS`].
    pub fn with_defaults() -> Result<Self> {
        let mut expander = Self::new();
        expander.extend(DEFAULT_MACROS.iter().copied())?;
        Ok(expander)
    }

    /// Register (or replace) one macro.
    pub fn register(&mut self, name: &str, expansion: &str) -> Result<()> {
        self.insert(name, expansion)?;
        self.rebuild()
    }

    /// Register several macros at once.
    pub fn extend<I, N, E>(&mut self, macros: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, E)>,
        N: AsRef<str>,
        E: AsRef<str>,
    {
        for (name, expansion) in macros {
            self.insert(name.as_ref(), expansion.as_ref())?;
        }
        self.rebuild()
    }

    /// Expansion registered for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }

    /// Number of registered macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// One non-recursive rewriting pass.
    pub fn expand(&self, expr: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return expr.to_string();
        };
        pattern
            .replace_all(expr, |caps: &Captures<'_>| match self.macros.get(&caps[1]) {
                Some(expansion) => format!("{expansion}({})", &caps[2]),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Repeat [`expand`](Self::expand) until the text stops changing, at most
    /// `max_iterations` times.
    pub fn expand_fixed_point(&self, expr: &str, max_iterations: usize) -> String {
        let mut current = expr.to_string();
        for _ in 0..max_iterations {
            let next = self.expand(&current);
            if next == current {
                return next;
            }
            current = next;
        }
        if self.expand(&current) != current {
            log::warn!("[macro] expansion of '{expr}' did not settle after {max_iterations} passes");
        }
        current
    }

    fn insert(&mut self, name: &str, expansion: &str) -> Result<()> {
        let name = name.trim();
        if !is_identifier(name) {
            return Err(Error::Config(format!("macro name '{name}' is not an identifier")));
        }
        if let Some(previous) = self.macros.insert(name.to_string(), expansion.trim().to_string()) {
            log::debug!("[macro] '{name}' redefined (was '{previous}')");
        }
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        if self.macros.is_empty() {
            self.pattern = None;
            return Ok(());
        }
        let mut names: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|");
        self.pattern = Some(Regex::new(&format!(r"\b({alternation})\s*\(([^)]*)\)"))?);
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> MacroExpander {
        MacroExpander::with_defaults().unwrap()
    }

    #[test]
    fn registered_alias() {
        let mut m = MacroExpander::new();
        m.register("SUM", "ROOT_SUM_EQUIV").unwrap();
        assert_eq!(m.expand("SUM(x>1)"), "ROOT_SUM_EQUIV(x>1)");
    }

    #[test]
    fn empty_table_is_identity() {
        let m = MacroExpander::new();
        for s in ["SUM(x>1)", "", "a && b", "SIZE(v) >= 2"] {
            assert_eq!(m.expand(s), s);
        }
        assert_eq!(defaults().expand("MET > 200 && abs(x) < 2"), "MET > 200 && abs(x) < 2");
    }

    #[test]
    fn whole_identifiers_only() {
        let m = defaults();
        assert_eq!(
            m.expand("NONEMPTY(v) && EMPTY(w) && MYSUM(z) > 0"),
            "!ROOT::VecOps::Empty(v) && ROOT::VecOps::Empty(w) && MYSUM(z) > 0"
        );
        assert_eq!(m.expand("SUMW(x)"), "SUMW(x)");
    }

    #[test]
    fn overlapping_names_do_not_depend_on_order() {
        let mut a = MacroExpander::new();
        a.register("PT", "pt_a").unwrap();
        a.register("PTX", "ptx_a").unwrap();
        let mut b = MacroExpander::new();
        b.register("PTX", "ptx_a").unwrap();
        b.register("PT", "pt_a").unwrap();
        let s = "PT(x) + PTX(y)";
        assert_eq!(a.expand(s), "pt_a(x) + ptx_a(y)");
        assert_eq!(a.expand(s), b.expand(s));
    }

    #[test]
    fn args_end_at_first_close_paren() {
        let m = defaults();
        assert_eq!(m.expand("SUM(abs(x) > 1) >= 2"), "ROOT::VecOps::Sum(abs(x) > 1) >= 2");
        // The inner call sits inside the outer match and survives one pass.
        assert_eq!(m.expand("SUM(SIZE(x))"), "ROOT::VecOps::Sum(SIZE(x))");
        assert_eq!(m.expand_fixed_point("SUM(SIZE(x))", 8), "ROOT::VecOps::Sum(ROOT::VecOps::Size(x))");
    }

    #[test]
    fn expansions_are_not_rescanned() {
        let mut m = MacroExpander::new();
        m.register("A", "B").unwrap();
        m.register("B", "C").unwrap();
        assert_eq!(m.expand("A(x)"), "B(x)");
        assert_eq!(m.expand_fixed_point("A(x)", 8), "C(x)");
    }

    #[test]
    fn fixed_point_is_capped() {
        let mut m = MacroExpander::new();
        m.register("A", "B").unwrap();
        m.register("B", "A").unwrap();
        assert_eq!(m.expand_fixed_point("A(x)", 3), "B(x)");
        assert_eq!(m.expand_fixed_point("A(x)", 0), "A(x)");
    }

    #[test]
    fn rejects_non_identifiers() {
        let mut m = MacroExpander::new();
        assert!(m.register("SUM(", "x").is_err());
        assert!(m.register("", "x").is_err());
        assert!(m.register("2X", "x").is_err());
        assert!(m.is_empty());
    }

    #[test]
    fn redefinition_replaces() {
        let mut m = defaults();
        m.register("SUM", "Sum").unwrap();
        assert_eq!(m.get("SUM"), Some("Sum"));
        assert_eq!(m.len(), DEFAULT_MACROS.len());
    }
}
