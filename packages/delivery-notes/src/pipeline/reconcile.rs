//! Compare the sum of line quantities with the total the document declares.

use serde::{Deserialize, Serialize};

use crate::types::table::{format_number, DeliveryTable};

/// Result of comparing a computed sum to a declared total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileStatus {
    Consistent,
    /// `difference` is declared minus computed
    Mismatch { difference: f64 },
    NoDeclaredTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub computed: f64,
    pub declared: Option<f64>,
    pub status: ReconcileStatus,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        matches!(self.status, ReconcileStatus::Consistent)
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self.status, ReconcileStatus::Mismatch { .. })
    }

    /// User-facing summary line.
    pub fn message(&self) -> String {
        match (self.status, self.declared) {
            (ReconcileStatus::Mismatch { .. }, Some(declared)) => format!(
                "Incohérence entre total annoncé ({}) et total calculé ({})",
                format_number(declared),
                format_number(self.computed)
            ),
            (ReconcileStatus::NoDeclaredTotal, _) => format!(
                "Aucun total annoncé ; total calculé : {} produits",
                format_number(self.computed)
            ),
            _ => format!("Total cohérent : {} produits", format_number(self.computed)),
        }
    }
}

/// Sum the numeric values and compare the sum with `declared`.
///
/// `None` values are left out of the sum. Equality is exact.
pub fn reconcile(values: &[Option<f64>], declared: Option<f64>) -> Reconciliation {
    let computed: f64 = values.iter().flatten().sum();

    let status = match declared {
        None => ReconcileStatus::NoDeclaredTotal,
        Some(total) if total == computed => ReconcileStatus::Consistent,
        Some(total) => ReconcileStatus::Mismatch {
            difference: total - computed,
        },
    };

    Reconciliation {
        computed,
        declared,
        status,
    }
}

/// Reconcile a table's item quantities with its declared total.
///
/// `declared_override` (from a dedicated model call) takes precedence over
/// the table's own total lines.
pub fn reconcile_table(table: &DeliveryTable, declared_override: Option<f64>) -> Reconciliation {
    let quantities: Vec<Option<f64>> = table.item_lines().map(|l| l.quantity).collect();
    reconcile(&quantities, declared_override.or_else(|| table.declared_total()))
}
