use crate::KindredError;
use crate::metric::{ResolvedWeight, lookup_weight_fn};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The only supported agglomeration backend.
pub const CLUSTER_METHOD: &str = "fastcluster";

/// Per-field weighting rule: a numeric constant, or the name of a registered
/// monotone function applied to the absolute difference before weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weight {
    Constant(f64),
    Function(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceSpec {
    pub col_name: String,
    pub weight: Weight,
}

/// One clustering request as read from the configuration JSON. Tolerance
/// fields are keyed by name; a BTreeMap keeps their order deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub cluster_method: String,
    pub eps: Vec<f64>,
    pub tol_dict: BTreeMap<String, ToleranceSpec>,
    pub partition_vars: Vec<String>,
    pub datevar: Option<String>,
    pub query_spec: Option<i64>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<RunConfig, KindredError> {
        let content = fs::read_to_string(path).map_err(KindredError::Io)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Eager validation: every failure here aborts before any clustering.
    pub fn validate(&self) -> Result<(), KindredError> {
        if self.cluster_method != CLUSTER_METHOD {
            return Err(KindredError::Config(format!(
                "unknown cluster method '{}' (supported: {})",
                self.cluster_method, CLUSTER_METHOD
            )));
        }
        if self.eps.is_empty() {
            return Err(KindredError::Config("eps list is empty".to_string()));
        }
        for &eps in &self.eps {
            if !eps.is_finite() || eps < 0.0 {
                return Err(KindredError::Config(format!(
                    "eps values must be non-negative and finite, got {}",
                    eps
                )));
            }
        }
        if self.tol_dict.is_empty() {
            return Err(KindredError::Config("tol_dict is empty".to_string()));
        }
        if self.partition_vars.is_empty() {
            return Err(KindredError::Config("partition_vars is empty".to_string()));
        }
        for (field, spec) in &self.tol_dict {
            if let Weight::Function(name) = &spec.weight {
                if lookup_weight_fn(name).is_none() {
                    return Err(KindredError::Config(format!(
                        "unknown weight function '{}' for tolerance field '{}'",
                        name, field
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check the configured columns against an actual table header.
    pub fn validate_against_table(&self, table: &Table) -> Result<(), KindredError> {
        for var in &self.partition_vars {
            if table.column_index(var).is_none() {
                return Err(KindredError::Config(format!(
                    "partition variable '{}' is not a column of the input table",
                    var
                )));
            }
        }
        for (field, spec) in &self.tol_dict {
            if table.column_index(&spec.col_name).is_none() {
                return Err(KindredError::Config(format!(
                    "tolerance field '{}' names missing column '{}'",
                    field, spec.col_name
                )));
            }
        }
        if let Some(datevar) = &self.datevar {
            if table.column_index(datevar).is_none() {
                return Err(KindredError::Config(format!(
                    "date column '{}' is not a column of the input table",
                    datevar
                )));
            }
        }
        Ok(())
    }

    /// Weights in tolerance-field order, with function names resolved against
    /// the registry.
    pub fn resolved_weights(&self) -> Result<Vec<ResolvedWeight>, KindredError> {
        self.tol_dict
            .iter()
            .map(|(field, spec)| match &spec.weight {
                Weight::Constant(w) => Ok(ResolvedWeight::Constant(*w)),
                Weight::Function(name) => lookup_weight_fn(name)
                    .map(ResolvedWeight::Function)
                    .ok_or_else(|| {
                        KindredError::Config(format!(
                            "unknown weight function '{}' for tolerance field '{}'",
                            name, field
                        ))
                    }),
            })
            .collect()
    }
}
