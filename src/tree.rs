use std::collections::{HashMap, HashSet};

use crate::models::{DepartmentId, DepartmentNode, DepartmentRecord, StructureAnomaly};

/// Materializes the flat record list into an owned forest.
///
/// Two passes: the id index is fully built before any nesting is assigned, so
/// a child may precede its parent in the input. Sibling order is input order.
/// A record whose `parent_id` resolves to nothing (or to itself) is demoted
/// to a root rather than dropped. On duplicate ids the first record wins and
/// later ones are ignored. Cycle members are promoted in input order so the
/// function terminates and keeps every surviving record in the output.
pub fn build_forest(records: &[DepartmentRecord]) -> Vec<DepartmentNode> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        index.entry(record.id.as_str()).or_insert(idx);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if index[record.id.as_str()] != idx {
            // Duplicate id, a prior record owns it.
            continue;
        }
        match record
            .parent_id
            .as_ref()
            .and_then(|parent| index.get(parent.as_str()))
        {
            Some(&parent_idx) if parent_idx != idx => children[parent_idx].push(idx),
            _ => roots.push(idx),
        }
    }

    let mut placed = vec![false; records.len()];
    let mut forest = Vec::with_capacity(roots.len());
    for idx in roots {
        forest.push(assemble(idx, records, &children, &mut placed));
    }

    // Anything still unplaced sits on a parent cycle and is unreachable from
    // every root. Promote the first member of each cycle in input order; the
    // rest of its cycle nests beneath it.
    for idx in 0..records.len() {
        if !placed[idx] && index[records[idx].id.as_str()] == idx {
            forest.push(assemble(idx, records, &children, &mut placed));
        }
    }

    forest
}

fn assemble(
    idx: usize,
    records: &[DepartmentRecord],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> DepartmentNode {
    placed[idx] = true;
    let record = &records[idx];

    let mut nested = Vec::with_capacity(children[idx].len());
    for &child in &children[idx] {
        // The placed guard breaks parent cycles during descent.
        if !placed[child] {
            nested.push(assemble(child, records, children, placed));
        }
    }

    DepartmentNode {
        id: record.id.clone(),
        name: record.name.clone(),
        parent_id: record.parent_id.clone(),
        created_at: record.created_at,
        updated_at: record.updated_at,
        children: nested,
    }
}

/// Whether any record names `id` as its parent. Leaves render without a
/// toggle control, so the editor asks this before flipping expand state.
pub fn has_children(records: &[DepartmentRecord], id: &DepartmentId) -> bool {
    records
        .iter()
        .any(|record| record.parent_id.as_ref() == Some(id) && &record.id != id)
}

/// One-pass structural report over a fetched list, in input order. Purely
/// diagnostic: the builder already has a policy for every case here.
pub fn structure_anomalies(records: &[DepartmentRecord]) -> Vec<StructureAnomaly> {
    let known: HashSet<&str> = records.iter().map(|record| record.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    let mut anomalies = Vec::new();

    for record in records {
        if !seen.insert(record.id.as_str()) {
            anomalies.push(StructureAnomaly::DuplicateId {
                id: record.id.clone(),
            });
        }
        if let Some(parent) = &record.parent_id {
            if parent == &record.id {
                anomalies.push(StructureAnomaly::SelfParent {
                    id: record.id.clone(),
                });
            } else if !known.contains(parent.as_str()) {
                anomalies.push(StructureAnomaly::DanglingParent {
                    id: record.id.clone(),
                    parent_id: parent.clone(),
                });
            }
        }
    }

    anomalies
}
