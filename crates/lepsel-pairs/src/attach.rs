//! Registration of pair quantities on an event graph node.
//!
//! All columns are closures over the per-lepton arrays, so they are only
//! computed for rows and columns that a downstream filter or materialization
//! actually references. Columns that already exist are left untouched.

use lepsel_core::naming::{self, LeptonField};
use lepsel_core::{Flavor, PairCategory, Scope};
use lepsel_frame::{Args, ColumnType, DType, Element, FrameError, Node, Result, ScalarType};

use crate::kinematics::{LeptonKinematics, delta_rs, masses};
use crate::pairs::category_pairs;
use crate::sides::gather;

/// Attach flavor codes, side views, pair lists, pair counts and pair
/// kinematics for every scope.
///
/// Side scopes are skipped (with a warning) when their index list is not a
/// column of the node.
pub fn attach_all(node: &Node) -> Result<Node> {
    let skipped = skipped_sides(node);
    let mut node = attach_flavor(node)?;
    for scope in Scope::ALL {
        if skipped.contains(&scope) {
            log::warn!("[pairs] no index column; side {scope} quantities are not defined");
            continue;
        }
        node = attach_side_view(&node, scope)?;
        node = attach_pairs(&node, scope)?;
        node = attach_kinematics(&node, scope)?;
    }
    Ok(node)
}

/// Side scopes that [`attach_all`] skips on `node` because their index list
/// is not a column.
pub fn skipped_sides(node: &Node) -> Vec<Scope> {
    Scope::ALL
        .into_iter()
        .filter(|&scope| naming::side_index(scope).is_some_and(|index| !node.has_column(&index)))
        .collect()
}

/// Define `Flavor_lep` (0 = electron, 1 = muon) from `PDGID_lep` unless the
/// store already provides it.
pub fn attach_flavor(node: &Node) -> Result<Node> {
    let flavor = naming::lepton(LeptonField::Flavor, Scope::All);
    if node.has_column(&flavor) {
        return Ok(node.clone());
    }
    let pdg = naming::lepton(LeptonField::PdgId, Scope::All);
    log::debug!("[pairs] deriving '{flavor}' from '{pdg}'");
    node.define_fn(&flavor, &[(pdg.as_str(), DType::SEQ_I32)], |a: &Args<'_>| {
        a.i32s(0).iter().map(|&id| Flavor::code_from_pdg_id(id)).collect::<Vec<i32>>()
    })
}

/// Define the `<Field>_lep_<side>` arrays of a side by gathering the full
/// collection through `Index_lep_<side>` (a `seq<i32>`).
///
/// A no-op for [`Scope::All`]. Fields missing from the full collection are
/// skipped.
pub fn attach_side_view(node: &Node, scope: Scope) -> Result<Node> {
    let Some(index) = naming::side_index(scope) else {
        return Ok(node.clone());
    };
    let mut node = node.clone();
    for field in LeptonField::VIEW {
        let source = naming::lepton(field, Scope::All);
        let target = naming::lepton(field, scope);
        if node.has_column(&target) {
            continue;
        }
        let Some(dtype) = node.dtype(&source) else {
            log::debug!("[pairs] no '{source}' column; '{target}' is not defined");
            continue;
        };
        node = match dtype {
            DType::Seq(ScalarType::F64) => define_gather::<f64>(&node, &target, &source, &index)?,
            DType::Seq(ScalarType::F32) => define_gather::<f32>(&node, &target, &source, &index)?,
            DType::Seq(ScalarType::I32) => define_gather::<i32>(&node, &target, &source, &index)?,
            DType::Seq(ScalarType::U32) => define_gather::<u32>(&node, &target, &source, &index)?,
            DType::Seq(ScalarType::I64) => define_gather::<i64>(&node, &target, &source, &index)?,
            DType::Seq(ScalarType::U64) => define_gather::<u64>(&node, &target, &source, &index)?,
            DType::Seq(ScalarType::Bool) => define_gather::<bool>(&node, &target, &source, &index)?,
            found => {
                return Err(FrameError::TypeMismatch {
                    column: source,
                    expected: DType::SEQ_F64,
                    found,
                });
            }
        };
    }
    Ok(node)
}

fn define_gather<T>(node: &Node, target: &str, source: &str, index: &str) -> Result<Node>
where
    T: Element,
    Vec<T>: ColumnType,
{
    node.define_fn(target, &[(source, DType::Seq(T::TYPE)), (index, DType::SEQ_I32)], |a: &Args<'_>| {
        gather(a.seq::<T>(0), a.i32s(1))
    })
}

/// Define the four pair lists of `scope` and their counts.
pub fn attach_pairs(node: &Node, scope: Scope) -> Result<Node> {
    let flavor = naming::lepton(LeptonField::Flavor, scope);
    let charge = naming::lepton(LeptonField::Charge, scope);
    let mut node = node.clone();
    for category in PairCategory::ALL {
        let list = naming::pair_list(scope, category);
        if !node.has_column(&list) {
            node = node.define_fn(
                &list,
                &[(flavor.as_str(), DType::SEQ_I32), (charge.as_str(), DType::SEQ_I32)],
                move |a: &Args<'_>| category_pairs(category, a.i32s(0), a.i32s(1)),
            )?;
        }
        let count = naming::pair_count(scope, category);
        if !node.has_column(&count) {
            node = node.define(&count, &format!("Size({list})"))?;
        }
    }
    Ok(node)
}

/// Define `Mass_<..>Pairs` and `DeltaR_<..>Pairs` for the four pair lists of
/// `scope`. Expects [`attach_pairs`] to have run for the same scope.
pub fn attach_kinematics(node: &Node, scope: Scope) -> Result<Node> {
    let pt = naming::lepton(LeptonField::Pt, scope);
    let eta = naming::lepton(LeptonField::Eta, scope);
    let phi = naming::lepton(LeptonField::Phi, scope);
    let m = naming::lepton(LeptonField::Mass, scope);
    let mut node = node.clone();
    for category in PairCategory::ALL {
        let list = naming::pair_list(scope, category);

        let mass = naming::pair_mass(scope, category);
        if !node.has_column(&mass) {
            let inputs = [
                (list.as_str(), DType::Pairs),
                (pt.as_str(), DType::SEQ_F64),
                (eta.as_str(), DType::SEQ_F64),
                (phi.as_str(), DType::SEQ_F64),
                (m.as_str(), DType::SEQ_F64),
            ];
            node = node.define_fn(&mass, &inputs, |a: &Args<'_>| {
                let k = LeptonKinematics { pt: a.f64s(1), eta: a.f64s(2), phi: a.f64s(3), mass: a.f64s(4) };
                masses(a.pairs(0), &k)
            })?;
        }

        let dr = naming::pair_delta_r(scope, category);
        if !node.has_column(&dr) {
            let inputs = [
                (list.as_str(), DType::Pairs),
                (eta.as_str(), DType::SEQ_F64),
                (phi.as_str(), DType::SEQ_F64),
            ];
            node = node.define_fn(&dr, &inputs, |a: &Args<'_>| delta_rs(a.pairs(0), a.f64s(1), a.f64s(2)))?;
        }
    }
    Ok(node)
}
