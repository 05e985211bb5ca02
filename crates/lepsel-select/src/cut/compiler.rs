//! Shorthand lepton-cut compiler.
//!
//! Token grammar:
//!
//! ```text
//! token   := head ( '|' extra )*
//! head    := count ( '_a' | '_b' )?          count := cmp N keyword
//!          | ( 'AllSS' | 'AllSF' ) ( '_a' | '_b' )?
//! cmp     := '<' | '<=' | '=' | '>=' | '>'
//! keyword := Gold | Silver | Bronze | Pos | Neg
//!          | OSSF | OSOF | SSSF | SSOF | Elec | Muon | Mu
//! extra   := ('mass' | 'DeltaR') ('<' | '<=' | '>' | '>=') number
//!          | 'mass![' number ',' number ']'
//! ```
//!
//! Extras only apply to pair-count heads. Keywords are matched in a fixed
//! order (quality, charge, `AllSS`, `AllSF`, pair count, flavor).

use lepsel_core::naming::{self, LeptonField};
use lepsel_core::{Charge, Flavor, PairCategory, Quality, Scope};

use super::ast::{CmpOp, CutExpr, Mask, Number, Operand};
use crate::diagnostic::{Component, Diagnostic};

const GRAMMAR_HINT: &str = "expected <cmp><N><Gold|Silver|Bronze|Pos|Neg|OSSF|OSOF|SSSF|SSOF|Elec|Muon|Mu>, \
                            AllSS or AllSF, optionally suffixed with _a/_b";

/// Result of compiling one token.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCut {
    /// Token as given, trimmed.
    pub token: String,
    /// Scope the names were resolved in.
    pub scope: Scope,
    /// Compiled tree, `None` when the token was rejected.
    pub cut: Option<CutExpr>,
    /// Everything worth telling the author, in order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledCut {
    /// Serialized filter expression; empty when the token was rejected.
    pub fn expression(&self) -> String {
        self.cut.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// `true` when the token compiled.
    pub fn is_valid(&self) -> bool {
        self.cut.is_some()
    }
}

/// Compile a token against an explicit scope, or against the scope named by
/// its `_a`/`_b` suffix when `scope` is `None`.
///
/// Never fails: a rejected token yields `cut: None` and exactly one error
/// diagnostic. Unrecognized pair predicates are dropped with one warning
/// each while the rest of the token still applies.
pub fn compile(token: &str, scope: Option<Scope>) -> CompiledCut {
    let token = token.trim();
    let mut segments = token.split('|');
    let head = segments.next().unwrap_or_default().trim();
    let extras: Vec<&str> = segments.map(str::trim).collect();

    let (head, suffix_scope) = strip_side_suffix(head);
    let scope = scope.or(suffix_scope).unwrap_or_default();

    let mut diagnostics = Vec::new();
    let cut = match parse_head(head, &extras, scope, token, &mut diagnostics) {
        Ok(cut) => Some(cut),
        Err(d) => {
            diagnostics.push(d);
            None
        }
    };
    CompiledCut { token: token.to_string(), scope, cut, diagnostics }
}

/// String-boundary form of [`compile`]: `scope` is `""`, `"a"` or `"b"`,
/// diagnostics go to the log and an invalid token compiles to `""`.
pub fn compile_cut(token: &str, scope: &str) -> String {
    let explicit = match scope.trim() {
        "" => None,
        s => match s.parse::<Scope>() {
            Ok(scope) => Some(scope),
            Err(e) => {
                Diagnostic::error(Component::Cut, token, format!("cannot compile '{token}': {e}")).emit();
                return String::new();
            }
        },
    };
    let compiled = compile(token, explicit);
    crate::diagnostic::emit_all(&compiled.diagnostics);
    compiled.expression()
}

fn strip_side_suffix(head: &str) -> (&str, Option<Scope>) {
    if let Some(rest) = head.strip_suffix("_a") {
        (rest, Some(Scope::A))
    } else if let Some(rest) = head.strip_suffix("_b") {
        (rest, Some(Scope::B))
    } else {
        (head, None)
    }
}

fn parse_head(
    head: &str,
    extras: &[&str],
    scope: Scope,
    token: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CutExpr, Diagnostic> {
    let reject = |message: String| Diagnostic::error(Component::Cut, token, message).with_hint(GRAMMAR_HINT);

    let (op, n, keyword) = match head {
        "AllSS" | "AllSF" => (None, 0, head),
        _ => {
            let (op, n, keyword) = split_count(head)
                .ok_or_else(|| reject(format!("unrecognized lepton cut '{token}'")))?;
            (Some(op), n, keyword)
        }
    };
    let is_pair = PairCategory::ALL.iter().any(|c| c.name() == keyword);
    if !is_pair && !extras.is_empty() {
        return Err(reject(format!("'{token}': pair predicates only apply to OSSF/OSOF/SSSF/SSOF counts")));
    }

    let count_of = |mask: Mask| op.map(|op| CutExpr::count(Operand::Sum(mask), op, n));

    if let Some(quality) = Quality::from_keyword(keyword)
        && let Some(cut) = count_of(lepton_mask(LeptonField::Quality, scope, quality.code()))
    {
        return Ok(cut);
    }
    if let Some(charge) = Charge::from_keyword(keyword)
        && let Some(cut) = count_of(lepton_mask(LeptonField::Charge, scope, charge.value()))
    {
        return Ok(cut);
    }
    if op.is_none() && keyword == "AllSS" {
        let charge = naming::lepton(LeptonField::Charge, scope);
        return Ok(all_equal(&charge, false, [Charge::Pos.value(), Charge::Neg.value()]));
    }
    if op.is_none() && keyword == "AllSF" {
        return Ok(match scope {
            Scope::All => all_equal(
                &naming::lepton(LeptonField::PdgId, scope),
                true,
                [Flavor::Electron.pdg_id(), Flavor::Muon.pdg_id()],
            ),
            _ => all_equal(
                &naming::lepton(LeptonField::Flavor, scope),
                false,
                [Flavor::Electron.code(), Flavor::Muon.code()],
            ),
        });
    }
    if let Some(op) = op
        && let Ok(category) = keyword.parse::<PairCategory>()
        && is_pair
    {
        return Ok(pair_count(category, scope, op, n, extras, token, diagnostics));
    }
    if let Some(flavor) = Flavor::from_keyword(keyword)
        && let Some(op) = op
    {
        let mask = match scope {
            Scope::All => Mask::Compare {
                column: naming::lepton(LeptonField::PdgId, scope),
                abs: true,
                op: CmpOp::Eq,
                value: Number::Int(flavor.pdg_id()),
            },
            _ => lepton_mask(LeptonField::Flavor, scope, flavor.code()),
        };
        return Ok(CutExpr::count(Operand::Sum(mask), op, n));
    }
    Err(reject(format!("unrecognized lepton cut '{token}'")))
}

/// Split `<cmp><N><keyword>`.
fn split_count(head: &str) -> Option<(CmpOp, u32, &str)> {
    let op_len = head.bytes().take_while(|b| matches!(b, b'<' | b'>' | b'=')).count();
    let op = CmpOp::from_shorthand(&head[..op_len])?;
    let rest = &head[op_len..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let n = rest[..digits].parse().ok()?;
    let keyword = &rest[digits..];
    (!keyword.is_empty()).then_some((op, n, keyword))
}

fn lepton_mask(field: LeptonField, scope: Scope, value: i32) -> Mask {
    Mask::compare(naming::lepton(field, scope), CmpOp::Eq, Number::Int(value))
}

/// Every element of `column` equals one of `values`, all the same one.
fn all_equal(column: &str, abs: bool, values: [i32; 2]) -> CutExpr {
    let branches = values
        .into_iter()
        .map(|v| CutExpr::Compare {
            lhs: Operand::Sum(Mask::Compare { column: column.to_string(), abs, op: CmpOp::Eq, value: Number::Int(v) }),
            op: CmpOp::Eq,
            rhs: Operand::Size(column.to_string()),
        })
        .collect();
    CutExpr::Any { branches }
}

fn pair_count(
    category: PairCategory,
    scope: Scope,
    op: CmpOp,
    n: u32,
    extras: &[&str],
    token: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> CutExpr {
    let mut masks = Vec::with_capacity(extras.len());
    for extra in extras {
        match parse_extra(extra, scope, category) {
            Some(mask) => masks.push(mask),
            None => diagnostics.push(
                Diagnostic::warning(
                    Component::Cut,
                    token,
                    format!("ignoring unrecognized pair predicate '{extra}' in '{token}'"),
                )
                .with_hint("expected mass<x, mass>x, mass![lo,hi], DeltaR<x or DeltaR>x"),
            ),
        }
    }
    if masks.is_empty() {
        return CutExpr::count(Operand::Column(naming::pair_count(scope, category)), op, n);
    }
    CutExpr::count(Operand::Sum(Mask::all(masks)), op, n)
}

/// One per-pair predicate over the mass or ΔR sequence of `category`.
fn parse_extra(extra: &str, scope: Scope, category: PairCategory) -> Option<Mask> {
    let (column, rest) = if let Some(rest) = strip_prefix_ignore_case(extra, "mass") {
        (naming::pair_mass(scope, category), rest.trim_start())
    } else if let Some(rest) = strip_prefix_ignore_case(extra, "deltar") {
        (naming::pair_delta_r(scope, category), rest.trim_start())
    } else {
        return None;
    };

    if let Some(band) = rest.strip_prefix('!') {
        if !column.starts_with("Mass_") {
            return None;
        }
        let inner = band.trim().strip_prefix('[')?.strip_suffix(']')?;
        let (low, high) = inner.split_once(',')?;
        let (low, high) = (parse_number(low)?, parse_number(high)?);
        return Some(Mask::Veto { column, low, high });
    }

    let op_len = rest.bytes().take_while(|b| matches!(b, b'<' | b'>' | b'=')).count();
    let op = match CmpOp::from_shorthand(&rest[..op_len])? {
        CmpOp::Eq => return None,
        op => op,
    };
    let value = parse_number(&rest[op_len..])?;
    Some(Mask::compare(column, op, Number::Float(value)))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
