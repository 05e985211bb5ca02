//! Selection-plan configuration.
//!
//! ```yaml
//! lumi: 138.0
//! weight: weight
//! macros:
//!   LEAD: FRONT
//! predefined_cuts:
//!   Cleaning: "MET > 50"
//! user_cuts:
//!   highMET: { expression: "MET > 200", columns: [MET] }
//! derived_variables:
//!   - { name: HT_lep, expr: "SUM(PT_lep)" }
//! validation: { n_check: 50, max_check: 5000 }
//! regions:
//!   - name: SR_2L
//!     cuts: "MET > 150"
//!     lep_cuts: [">=1OSSF|mass<65", "AllSF"]
//!     predefined_cuts: Cleaning
//!     user_cuts: [highMET]
//! ```
//!
//! Cut lists accept a YAML sequence or a single string separated by `;`
//! (or by `,` when the string has no `;`).

use std::collections::BTreeMap;
use std::path::Path;

use lepsel_core::DerivedVar;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::macros::MacroExpander;

/// Sampling limits of the derived-variable validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Rows read by the first typed attempt.
    pub n_check: usize,
    /// Largest prefix read while the data look degenerate.
    pub max_check: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { n_check: 50, max_check: 5000 }
    }
}

/// A named user cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCut {
    /// Filter expression (macros allowed).
    pub expression: String,
    /// Columns the expression needs; each is validated before use.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl UserCut {
    /// Create a user cut with no declared columns.
    pub fn new(expression: impl Into<String>) -> Self {
        Self { expression: expression.into(), columns: Vec::new() }
    }

    /// Declare a column the expression needs.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }
}

/// One analysis region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region name.
    pub name: String,
    /// Plain filter expressions.
    #[serde(default, deserialize_with = "string_or_list")]
    pub cuts: Vec<String>,
    /// Shorthand lepton cuts.
    #[serde(default, alias = "lep-cuts", deserialize_with = "string_or_list")]
    pub lep_cuts: Vec<String>,
    /// Names of predefined cuts.
    #[serde(default, alias = "predefined-cuts", deserialize_with = "string_or_list")]
    pub predefined_cuts: Vec<String>,
    /// Names of user cuts.
    #[serde(default, alias = "user-cuts", deserialize_with = "string_or_list")]
    pub user_cuts: Vec<String>,
}

impl RegionConfig {
    /// Create an empty region.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Add a plain filter expression.
    pub fn cut(mut self, expr: impl Into<String>) -> Self {
        self.cuts.push(expr.into());
        self
    }

    /// Add a shorthand lepton cut.
    pub fn lep_cut(mut self, token: impl Into<String>) -> Self {
        self.lep_cuts.push(token.into());
        self
    }

    /// Reference a predefined cut.
    pub fn predefined_cut(mut self, name: impl Into<String>) -> Self {
        self.predefined_cuts.push(name.into());
        self
    }

    /// Reference a user cut.
    pub fn user_cut(mut self, name: impl Into<String>) -> Self {
        self.user_cuts.push(name.into());
        self
    }
}

/// A complete selection plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Integrated luminosity applied to the event weight.
    #[serde(default = "default_lumi")]
    pub lumi: f64,
    /// Per-event weight column.
    #[serde(default = "default_weight")]
    pub weight: String,
    /// Macros registered on top of the built-in aliases.
    #[serde(default)]
    pub macros: BTreeMap<String, String>,
    /// Named filter expressions regions may reference.
    #[serde(default)]
    pub predefined_cuts: BTreeMap<String, String>,
    /// Named user cuts with their column requirements.
    #[serde(default)]
    pub user_cuts: BTreeMap<String, UserCut>,
    /// Columns to add after validation.
    #[serde(default)]
    pub derived_variables: Vec<DerivedVar>,
    /// Validator sampling limits.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Regions, evaluated in order.
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}

fn default_lumi() -> f64 {
    1.0
}

fn default_weight() -> String {
    "weight".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            lumi: default_lumi(),
            weight: default_weight(),
            macros: BTreeMap::new(),
            predefined_cuts: BTreeMap::new(),
            user_cuts: BTreeMap::new(),
            derived_variables: Vec::new(),
            validation: ValidationConfig::default(),
            regions: Vec::new(),
        }
    }
}

impl SelectionConfig {
    /// Empty plan with unit luminosity and the `weight` column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and check a YAML plan.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Read, parse and check a YAML plan.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Set the luminosity.
    pub fn lumi(mut self, lumi: f64) -> Self {
        self.lumi = lumi;
        self
    }

    /// Set the weight column.
    pub fn weight(mut self, column: impl Into<String>) -> Self {
        self.weight = column.into();
        self
    }

    /// Register an extra macro.
    pub fn macro_def(mut self, name: impl Into<String>, expansion: impl Into<String>) -> Self {
        self.macros.insert(name.into(), expansion.into());
        self
    }

    /// Add a predefined cut.
    pub fn predefined_cut(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.predefined_cuts.insert(name.into(), expr.into());
        self
    }

    /// Add a user cut.
    pub fn user_cut(mut self, name: impl Into<String>, cut: UserCut) -> Self {
        self.user_cuts.insert(name.into(), cut);
        self
    }

    /// Request a derived variable.
    pub fn derived(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.derived_variables.push(DerivedVar::new(name, expr));
        self
    }

    /// Set the validator limits.
    pub fn validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Add a region.
    pub fn region(mut self, region: RegionConfig) -> Self {
        self.regions.push(region);
        self
    }

    /// Built-in macros plus [`SelectionConfig::macros`].
    pub fn macro_expander(&self) -> Result<MacroExpander> {
        let mut expander = MacroExpander::with_defaults()?;
        expander.extend(&self.macros)?;
        Ok(expander)
    }

    /// Reject plans that cannot be run at all.
    pub fn check(&self) -> Result<()> {
        if !self.lumi.is_finite() {
            return Err(Error::Config(format!("lumi must be finite, got {}", self.lumi)));
        }
        if self.weight.trim().is_empty() {
            return Err(Error::Config("weight column name is empty".into()));
        }
        if self.validation.max_check < self.validation.n_check {
            return Err(Error::Config(format!(
                "validation.max_check ({}) is smaller than validation.n_check ({})",
                self.validation.max_check, self.validation.n_check
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for region in &self.regions {
            if region.name.trim().is_empty() {
                return Err(Error::Config("region with an empty name".into()));
            }
            if !seen.insert(region.name.as_str()) {
                return Err(Error::Config(format!("duplicate region '{}'", region.name)));
            }
        }
        Ok(())
    }
}

/// Split a cut list written as one string: `;`-separated when it contains a
/// `;`, otherwise `,`-separated. Delimiters inside `()` or `[]` never split,
/// so `mass![81,101]` and `SafeDiv(a, b)` stay whole. Items are trimmed and
/// empty items dropped.
pub fn split_top_level(s: &str) -> Vec<String> {
    let delim = if s.contains(';') { ';' } else { ',' };
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            c if c == delim && depth == 0 => {
                items.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    items.push(&s[start..]);
    items.into_iter().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany>::deserialize(d)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => split_top_level(&s),
        Some(OneOrMany::Many(items)) => {
            items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
lumi: 138.0
macros:
  LEAD: FRONT
predefined_cuts:
  Cleaning: "MET > 50"
user_cuts:
  highMET: { expression: "MET > 200", columns: [MET] }
derived_variables:
  - { name: HT_lep, expr: "SUM(PT_lep)" }
regions:
  - name: SR
    cuts: "MET > 150; nJet >= 1"
    lep-cuts: [">=1OSSF|mass<65", " AllSF "]
    predefined_cuts: Cleaning
    user_cuts: [highMET]
  - name: CR
"#;

    #[test]
    fn parses_plan() {
        let c = SelectionConfig::from_yaml_str(PLAN).unwrap();
        assert_eq!(c.lumi, 138.0);
        assert_eq!(c.weight, "weight");
        assert_eq!(c.validation, ValidationConfig::default());
        assert_eq!(c.user_cuts["highMET"], UserCut::new("MET > 200").column("MET"));
        assert_eq!(c.derived_variables, vec![DerivedVar::new("HT_lep", "SUM(PT_lep)")]);

        let sr = &c.regions[0];
        assert_eq!(sr.cuts, vec!["MET > 150", "nJet >= 1"]);
        assert_eq!(sr.lep_cuts, vec![">=1OSSF|mass<65", "AllSF"]);
        assert_eq!(sr.predefined_cuts, vec!["Cleaning"]);
        assert_eq!(c.regions[1], RegionConfig::new("CR"));
    }

    #[test]
    fn builder_matches_yaml() {
        let built = SelectionConfig::new()
            .lumi(138.0)
            .macro_def("LEAD", "FRONT")
            .predefined_cut("Cleaning", "MET > 50")
            .user_cut("highMET", UserCut::new("MET > 200").column("MET"))
            .derived("HT_lep", "SUM(PT_lep)")
            .region(
                RegionConfig::new("SR")
                    .cut("MET > 150")
                    .cut("nJet >= 1")
                    .lep_cut(">=1OSSF|mass<65")
                    .lep_cut("AllSF")
                    .predefined_cut("Cleaning")
                    .user_cut("highMET"),
            )
            .region(RegionConfig::new("CR"));
        assert_eq!(built, SelectionConfig::from_yaml_str(PLAN).unwrap());
    }

    #[test]
    fn config_macros_extend_defaults() {
        let c = SelectionConfig::from_yaml_str(PLAN).unwrap();
        let m = c.macro_expander().unwrap();
        assert_eq!(m.expand("LEAD(PT_lep) > 20 && SIZE(PT_lep) > 1"), "FRONT(PT_lep) > 20 && ROOT::VecOps::Size(PT_lep) > 1");
    }

    #[test]
    fn split_lists() {
        assert_eq!(split_top_level("a, b ,,c"), vec!["a", "b", "c"]);
        assert_eq!(split_top_level("x > 1, 2; y"), vec!["x > 1, 2", "y"]);
        assert!(split_top_level("  ").is_empty());
    }

    #[test]
    fn split_keeps_bracketed_commas() {
        assert_eq!(split_top_level(">=1OSSF|mass![81,101]"), vec![">=1OSSF|mass![81,101]"]);
        assert_eq!(
            split_top_level("AllSS, =0OSSF|mass![81,101], SafeDiv(MET, HT, 0) > 2"),
            vec!["AllSS", "=0OSSF|mass![81,101]", "SafeDiv(MET, HT, 0) > 2"]
        );
        let region: RegionConfig =
            serde_yaml_ng::from_str("{name: Z, lep_cuts: \">=1OSSF|mass![81,101]\"}").unwrap();
        assert_eq!(region.lep_cuts, vec![">=1OSSF|mass![81,101]"]);
    }

    #[test]
    fn rejects_broken_plans() {
        assert!(SelectionConfig::from_yaml_str("regions: [{name: A}, {name: A}]").is_err());
        assert!(SelectionConfig::from_yaml_str("validation: {n_check: 100, max_check: 10}").is_err());
        assert!(SelectionConfig::from_yaml_str("lumi: .nan").is_err());
        assert!(matches!(SelectionConfig::from_yaml_str("regions: 3"), Err(Error::Yaml(_))));
    }
}
