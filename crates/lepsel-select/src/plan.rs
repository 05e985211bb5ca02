//! Selection plans: node preparation, per-region filter lists, cut-flows and
//! yields.

use lepsel_core::{DerivedVar, naming};
use lepsel_frame::Node;
use serde::Serialize;

use crate::config::{RegionConfig, SelectionConfig};
use crate::cut;
use crate::diagnostic::{Component, Diagnostic, emit_all};
use crate::error::{Error, Result};
use crate::macros::MacroExpander;
use crate::validate::{Validation, Validator};

/// Event weight times luminosity.
pub const WEIGHT_SCALED: &str = "weight_scaled";
/// Square of [`WEIGHT_SCALED`].
pub const WEIGHT_SQ_SCALED: &str = "weight_sq_scaled";

// ── Preparation ─────────────────────────────────────────────────

/// A node ready for region filters.
#[derive(Debug, Clone)]
pub struct PreparedNode {
    /// Source columns plus weights, pair quantities and accepted derived
    /// variables.
    pub node: Node,
    /// One verdict per requested derived variable, in request order.
    pub validations: Vec<Validation>,
    /// Diagnostics not tied to a validation verdict.
    pub diagnostics: Vec<Diagnostic>,
}

impl PreparedNode {
    /// Names of the derived variables that were defined.
    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        self.validations.iter().filter(|v| v.accepted).map(|v| v.name.as_str())
    }
}

/// Define the scaled weights, attach every pair quantity, then validate and
/// define the derived variables.
///
/// Derived expressions are macro-expanded first and type-checked against the node
/// as extended by the variables accepted before them. A rejected variable is
/// left out; only a missing weight column or a failure to attach the pair
/// quantities is an error.
pub fn prepare_node(
    node: &Node,
    config: &SelectionConfig,
    expander: &MacroExpander,
    validator: &Validator,
) -> Result<PreparedNode> {
    let weight = config.weight.as_str();
    if !node.has_column(weight) {
        return Err(Error::Config(format!("weight column '{weight}' not found")));
    }
    let node = node
        .define(WEIGHT_SCALED, &format!("{weight} * {:?}", config.lumi))?
        .define(WEIGHT_SQ_SCALED, &format!("{WEIGHT_SCALED} * {WEIGHT_SCALED}"))?;
    // attach_all logs the skipped sides itself.
    let diagnostics = lepsel_pairs::skipped_sides(&node)
        .into_iter()
        .map(|scope| {
            Diagnostic::warning(
                Component::Plan,
                naming::side_index(scope).unwrap_or_default(),
                format!("side {scope} has no index column; its lepton and pair columns are not defined"),
            )
        })
        .collect();
    let mut node = lepsel_pairs::attach_all(&node)?;

    let mut validations = Vec::with_capacity(config.derived_variables.len());
    for requested in &config.derived_variables {
        let dv = DerivedVar::new(requested.name.clone(), expander.expand(&requested.expr));
        let mut verdict = if node.has_column(&dv.name) {
            let d = Diagnostic::error(
                Component::Plan,
                &dv.name,
                format!("derived variable '{}' collides with an existing column", dv.name),
            );
            Validation::rejected(&dv, d)
        } else {
            validator.report(&node, &dv)
        };
        if verdict.accepted {
            match node.define(&dv.name, &dv.expr) {
                Ok(next) => node = next,
                Err(e) => {
                    verdict.reject(Diagnostic::error(
                        Component::Plan,
                        &dv.name,
                        format!("failed to define derived variable '{}' from '{}': {e}", dv.name, dv.expr),
                    ));
                }
            }
        }
        emit_all(&verdict.diagnostics);
        validations.push(verdict);
    }
    log::debug!("[plan] prepared node with {} columns", node.column_names().len());
    Ok(PreparedNode { node, validations, diagnostics })
}

// ── Region plans ────────────────────────────────────────────────

/// Where a filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Plain expression.
    Cut,
    /// Compiled shorthand lepton cut.
    LeptonCut,
    /// Named predefined cut.
    Predefined,
    /// Named user cut.
    User,
}

/// One labelled filter of a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStep {
    /// Cut-flow label: the cut text, token or name.
    pub label: String,
    /// Macro-expanded filter expression.
    pub expression: String,
    /// Origin.
    pub kind: FilterKind,
}

/// Ordered filters of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPlan {
    /// Region name.
    pub name: String,
    /// Plain cuts, then lepton cuts, then predefined cuts, then user cuts.
    pub filters: Vec<FilterStep>,
    /// Why requested filters were dropped or changed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl RegionPlan {
    /// Resolve a region's cut lists into expanded filter expressions.
    ///
    /// Invalid lepton cuts, unknown cut names and user cuts whose declared
    /// columns fail validation against `node` are dropped with a diagnostic.
    pub fn build(
        node: &Node,
        region: &RegionConfig,
        config: &SelectionConfig,
        expander: &MacroExpander,
        validator: &Validator,
    ) -> Self {
        let mut plan = Self { name: region.name.clone(), filters: Vec::new(), diagnostics: Vec::new() };

        for c in &region.cuts {
            plan.push(c, expander.expand(c), FilterKind::Cut);
        }

        for token in &region.lep_cuts {
            let compiled = cut::compile(token, None);
            plan.diagnostics.extend(compiled.diagnostics.iter().cloned());
            if compiled.is_valid() {
                plan.push(token, expander.expand(&compiled.expression()), FilterKind::LeptonCut);
            }
        }

        for name in &region.predefined_cuts {
            match config.predefined_cuts.get(name) {
                Some(expr) => plan.push(name, expander.expand(expr), FilterKind::Predefined),
                None => plan.drop_cut(name, format!("unknown predefined cut '{name}' in region '{}'", region.name)),
            }
        }

        for name in &region.user_cuts {
            let Some(user) = config.user_cuts.get(name) else {
                plan.drop_cut(name, format!("requested user cut not found: '{name}' in region '{}'", region.name));
                continue;
            };
            let failed: Vec<Validation> = user
                .columns
                .iter()
                .map(|column| validator.report(node, &DerivedVar::existing(column.as_str())))
                .filter(|v| !v.accepted)
                .collect();
            if failed.is_empty() {
                plan.push(name, expander.expand(&user.expression), FilterKind::User);
                continue;
            }
            let columns: Vec<&str> = failed.iter().map(|v| v.name.as_str()).collect();
            for v in failed.iter() {
                plan.diagnostics.extend(v.diagnostics.iter().cloned());
            }
            plan.drop_cut(name, format!("user cut '{name}' dropped: columns {columns:?} failed validation"));
        }
        plan
    }

    /// Apply every filter in order.
    pub fn apply(&self, node: &Node) -> Result<Node> {
        let mut node = node.clone();
        for step in &self.filters {
            node = node.filter(&step.expression)?;
        }
        Ok(node)
    }

    fn push(&mut self, label: &str, expression: String, kind: FilterKind) {
        if expression.trim().is_empty() {
            return;
        }
        self.filters.push(FilterStep { label: label.trim().to_string(), expression, kind });
    }

    fn drop_cut(&mut self, subject: &str, message: String) {
        self.diagnostics.push(Diagnostic::error(Component::Plan, subject, message));
    }
}

// ── Cut-flows and yields ────────────────────────────────────────

/// Weighted event count passing a point of the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutFlowEntry {
    /// Filter label, `"total"` for the unfiltered node.
    pub label: String,
    /// Raw number of events.
    pub events: u64,
    /// Σw over [`WEIGHT_SCALED`].
    pub sumw: f64,
    /// √Σw² over [`WEIGHT_SQ_SCALED`].
    pub err: f64,
}

/// Cumulative cut-flow of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutFlow {
    /// Before any filter.
    pub total: CutFlowEntry,
    /// After each filter, in plan order.
    pub steps: Vec<CutFlowEntry>,
}

impl CutFlow {
    /// Last entry: the region's yield.
    pub fn last(&self) -> &CutFlowEntry {
        self.steps.last().unwrap_or(&self.total)
    }
}

/// Final event count and weighted yield of a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Yield {
    /// Raw number of events.
    pub events: u64,
    /// Σw.
    pub sumw: f64,
    /// √max(Σw², 0).
    pub err: f64,
}

impl From<&CutFlowEntry> for Yield {
    fn from(e: &CutFlowEntry) -> Self {
        Self { events: e.events, sumw: e.sumw, err: e.err }
    }
}

fn entry(label: &str, node: &Node) -> Result<CutFlowEntry> {
    let w = node.take::<f64>(WEIGHT_SCALED)?;
    let w2 = node.take::<f64>(WEIGHT_SQ_SCALED)?;
    Ok(CutFlowEntry {
        label: label.to_string(),
        events: w.len() as u64,
        sumw: w.iter().sum(),
        err: w2.iter().sum::<f64>().max(0.0).sqrt(),
    })
}

/// Total entry followed by one cumulative entry per filter.
pub fn cutflow(node: &Node, plan: &RegionPlan) -> Result<CutFlow> {
    let total = entry("total", node)?;
    let mut current = node.clone();
    let mut steps = Vec::with_capacity(plan.filters.len());
    for step in &plan.filters {
        current = current.filter(&step.expression)?;
        steps.push(entry(&step.label, &current)?);
    }
    Ok(CutFlow { total, steps })
}

/// Yield after all of the plan's filters.
pub fn region_yield(node: &Node, plan: &RegionPlan) -> Result<Yield> {
    Ok(Yield::from(&entry("yield", &plan.apply(node)?)?))
}

// ── Whole plans ─────────────────────────────────────────────────

/// Result for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    /// Region name.
    pub name: String,
    /// Filters that were applied.
    pub filters: Vec<FilterStep>,
    /// Cut-flow, `None` when the region was dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutflow: Option<CutFlow>,
    /// Final yield, `None` when the region was dropped.
    #[serde(rename = "yield", skip_serializing_if = "Option::is_none")]
    pub region_yield: Option<Yield>,
    /// Everything reported while building and running the region.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl RegionReport {
    /// `true` when a filter could not be attached and the region was skipped.
    pub fn is_dropped(&self) -> bool {
        self.cutflow.is_none()
    }
}

/// Results for every region of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    /// Regions in configuration order.
    pub regions: Vec<RegionReport>,
}

impl SelectionReport {
    /// Region by name.
    pub fn region(&self, name: &str) -> Option<&RegionReport> {
        self.regions.iter().find(|r| r.name == name)
    }
}

/// Build, run and report every region of `config` on a prepared node.
///
/// A region whose filters cannot be attached or evaluated is reported as
/// dropped; the remaining regions still run.
pub fn run_regions(
    node: &Node,
    config: &SelectionConfig,
    expander: &MacroExpander,
    validator: &Validator,
) -> SelectionReport {
    let regions = config
        .regions
        .iter()
        .map(|region| {
            let plan = RegionPlan::build(node, region, config, expander, validator);
            let mut diagnostics = plan.diagnostics.clone();
            let flow = match cutflow(node, &plan) {
                Ok(flow) => Some(flow),
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        Component::Plan,
                        &plan.name,
                        format!("region '{}' dropped: {e}", plan.name),
                    ));
                    None
                }
            };
            emit_all(&diagnostics);
            if let Some(flow) = &flow {
                let y = flow.last();
                log::info!("[plan] region '{}': {} events, sumw = {:.4} ± {:.4}", plan.name, y.events, y.sumw, y.err);
            }
            RegionReport {
                name: plan.name,
                region_yield: flow.as_ref().map(|f| Yield::from(f.last())),
                cutflow: flow,
                filters: plan.filters,
                diagnostics,
            }
        })
        .collect();
    SelectionReport { regions }
}
