//! Department → manager address table.
//!
//! Built once at startup from configuration and validated against the fixed
//! set of department codes. Lookups never fail: unknown departments and
//! departments without an address resolve to the default manager.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Department codes the submission form offers.
pub const DEPARTMENT_CODES: &[&str] = &[
    "HR_dep", "IT_dep", "GA_dep", "FA_dep", "FN_dep", "MC_dep", "SL_dep", "ST_dep", "FT_dep",
    "SV_dep", "CC_dep", "BP_dep", "BW_dep", "KR_dep", "KK_dep", "MP_dep", "LC_dep", "PK_dep",
    "PY_dep",
];

pub const FALLBACK_MANAGER: &str = "default.manager@example.com";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s<>]+@[^@\s<>]+\.[^@\s<>]+$").expect("valid email regex"));

pub fn is_valid_address(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

/// Environment variable holding the manager address of `code`,
/// e.g. `HR_dep` → `HR_MANAGER_EMAIL`.
pub fn manager_env_var(code: &str) -> String {
    format!("{}_MANAGER_EMAIL", code.trim_end_matches("_dep"))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("unknown department code: {0}")]
    UnknownDepartment(String),

    #[error("invalid email address for {key}: {address}")]
    InvalidAddress { key: String, address: String },
}

/// Why a lookup ended at the default address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    UnknownDepartment,
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient<'a> {
    pub address: &'a str,
    pub fallback: Option<Fallback>,
}

#[derive(Debug, Clone)]
pub struct DepartmentDirectory {
    managers: BTreeMap<String, String>,
    default_manager: String,
}

impl DepartmentDirectory {
    pub fn new(default_manager: impl Into<String>) -> Result<Self, DirectoryError> {
        let default_manager = default_manager.into();
        if !is_valid_address(&default_manager) {
            return Err(DirectoryError::InvalidAddress {
                key: "MANAGER_EMAIL_DEFAULT".into(),
                address: default_manager,
            });
        }
        Ok(Self {
            managers: BTreeMap::new(),
            default_manager,
        })
    }

    pub fn with_manager(
        mut self,
        code: &str,
        address: impl Into<String>,
    ) -> Result<Self, DirectoryError> {
        if !DEPARTMENT_CODES.contains(&code) {
            return Err(DirectoryError::UnknownDepartment(code.to_string()));
        }
        let address = address.into();
        if !is_valid_address(&address) {
            return Err(DirectoryError::InvalidAddress {
                key: manager_env_var(code),
                address,
            });
        }
        self.managers.insert(code.to_string(), address);
        Ok(self)
    }

    /// Build from `<XX>_MANAGER_EMAIL` variables. Blank values count as unset.
    pub fn from_lookup<F>(default_manager: &str, lookup: F) -> Result<Self, DirectoryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut directory = Self::new(default_manager)?;
        for code in DEPARTMENT_CODES {
            match lookup(&manager_env_var(code)) {
                Some(address) if !address.trim().is_empty() => {
                    directory = directory.with_manager(code, address.trim())?;
                }
                _ => tracing::warn!(
                    department = code,
                    "no manager address configured, approvals will go to the default manager"
                ),
            }
        }
        Ok(directory)
    }

    pub fn default_manager(&self) -> &str {
        &self.default_manager
    }

    pub fn configured(&self) -> usize {
        self.managers.len()
    }

    pub fn resolve(&self, department: &str) -> Recipient<'_> {
        if let Some(address) = self.managers.get(department) {
            return Recipient {
                address,
                fallback: None,
            };
        }
        let reason = if DEPARTMENT_CODES.contains(&department) {
            Fallback::NotConfigured
        } else {
            Fallback::UnknownDepartment
        };
        Recipient {
            address: &self.default_manager,
            fallback: Some(reason),
        }
    }
}
