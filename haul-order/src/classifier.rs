use haul_core::{CodeSnapshot, CodeState, TrackingCode, WarehouseItemStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The bucket a single tracking code lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeVerdict {
    Valid,
    /// Not found in the system
    Invalid,
    /// Known, but not sitting in the warehouse
    NotImported,
    /// Held by an active packing
    AlreadyPacked,
}

/// Raw operator input after blank removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBatch {
    /// Every non-blank code with its index in the raw input, repeats included.
    pub positional: Vec<(usize, TrackingCode)>,
    /// First occurrence of each code, in input order.
    pub distinct: Vec<TrackingCode>,
}

impl CodeBatch {
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut seen = HashSet::new();
        let mut batch = CodeBatch::default();

        for (position, value) in raw.iter().enumerate() {
            let Some(code) = TrackingCode::parse(value.as_ref()) else {
                continue;
            };
            if seen.insert(code.clone()) {
                batch.distinct.push(code.clone());
            }
            batch.positional.push((position, code));
        }

        batch
    }

    pub fn is_empty(&self) -> bool {
        self.distinct.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub position: usize,
    pub code: TrackingCode,
    pub verdict: CodeVerdict,
    /// True when this position repeats an earlier code and inherits its verdict.
    pub repeat: bool,
}

/// Disjoint buckets over the distinct codes of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub valid: Vec<TrackingCode>,
    pub invalid: Vec<TrackingCode>,
    pub not_imported: Vec<TrackingCode>,
    pub already_packed: Vec<TrackingCode>,
    /// Distinct codes physically on premises, packed or not.
    pub warehouse_count: usize,
    pub entries: Vec<CodeEntry>,
}

impl Classification {
    pub fn has_errors(&self) -> bool {
        !(self.invalid.is_empty() && self.not_imported.is_empty() && self.already_packed.is_empty())
    }
}

pub struct TrackingCodeClassifier;

impl TrackingCodeClassifier {
    /// Precedence: missing, then held by a packing, then not in the warehouse.
    pub fn verdict(state: Option<&CodeState>) -> CodeVerdict {
        let Some(state) = state else {
            return CodeVerdict::Invalid;
        };

        if state.active_packing.is_some() || state.item.status == WarehouseItemStatus::Packed {
            return CodeVerdict::AlreadyPacked;
        }

        if state.item.status != WarehouseItemStatus::InWarehouse {
            return CodeVerdict::NotImported;
        }

        CodeVerdict::Valid
    }

    pub fn classify(batch: &CodeBatch, snapshot: &CodeSnapshot) -> Classification {
        let mut classification = Classification::default();
        let mut verdicts: HashMap<&TrackingCode, CodeVerdict> = HashMap::new();

        for code in &batch.distinct {
            let state = snapshot.get(code);
            let verdict = Self::verdict(state);

            if state.is_some_and(|s| s.item.status.is_on_premises()) {
                classification.warehouse_count += 1;
            }

            let bucket = match verdict {
                CodeVerdict::Valid => &mut classification.valid,
                CodeVerdict::Invalid => &mut classification.invalid,
                CodeVerdict::NotImported => &mut classification.not_imported,
                CodeVerdict::AlreadyPacked => &mut classification.already_packed,
            };
            bucket.push(code.clone());
            verdicts.insert(code, verdict);
        }

        let mut seen = HashSet::new();
        for (position, code) in &batch.positional {
            // Every positional code is also in `distinct`, so the lookup cannot miss
            let verdict = verdicts.get(code).copied().unwrap_or(CodeVerdict::Invalid);
            classification.entries.push(CodeEntry {
                position: *position,
                code: code.clone(),
                verdict,
                repeat: !seen.insert(code),
            });
        }

        classification
    }
}
