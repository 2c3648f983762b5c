//! Policy providers
//!
//! Two `PolicyProvider` implementations ship with the engine:
//!
//! - `UnconfiguredPolicy` fails every capability with
//!   `PolicyError::Unconfigured`. It is the default so that a host wiring up
//!   the dispatcher cannot silently run with made-up business rules.
//! - `StandardPolicy` is an in-memory reference implementation driven by a
//!   `StandardPolicyConfig` and a registered item catalogue. The replay CLI
//!   and the test suite run on it.

use crate::core::traits::PolicyProvider;
use crate::types::{ActorContext, ItemPid, Loan, LoanPid, LocationPid, PolicyError, Trigger};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Policy that refuses to answer anything
///
/// Every capability fails with `Unconfigured`, which the dispatcher surfaces
/// as a `PolicyEvaluation` error. No transition can commit on top of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredPolicy;

impl UnconfiguredPolicy {
    /// Create an UnconfiguredPolicy
    pub fn new() -> Self {
        UnconfiguredPolicy
    }
}

impl PolicyProvider for UnconfiguredPolicy {
    fn item_can_circulate(&self, _item_pid: &str) -> Result<bool, PolicyError> {
        Err(PolicyError::unconfigured("item_can_circulate"))
    }

    fn loan_duration(&self, _loan: &Loan) -> Result<i64, PolicyError> {
        Err(PolicyError::unconfigured("loan_duration"))
    }

    fn extension_duration(&self, _loan: &Loan) -> Result<i64, PolicyError> {
        Err(PolicyError::unconfigured("extension_duration"))
    }

    fn is_loan_duration_valid(&self, _loan: &Loan) -> Result<bool, PolicyError> {
        Err(PolicyError::unconfigured("is_loan_duration_valid"))
    }

    fn should_auto_assign_item(&self, _loan: &Loan) -> Result<bool, PolicyError> {
        Err(PolicyError::unconfigured("should_auto_assign_item"))
    }

    fn can_extend(&self, _loan: &Loan) -> Result<bool, PolicyError> {
        Err(PolicyError::unconfigured("can_extend"))
    }

    fn can_be_requested(&self, _loan: &Loan) -> Result<bool, PolicyError> {
        Err(PolicyError::unconfigured("can_be_requested"))
    }

    fn is_trigger_permitted(
        &self,
        _actor: &ActorContext,
        _loan: &Loan,
        _trigger: Trigger,
    ) -> Result<bool, PolicyError> {
        Err(PolicyError::unconfigured("is_trigger_permitted"))
    }

    fn available_item_for_document(
        &self,
        _document_pid: &str,
    ) -> Result<Option<ItemPid>, PolicyError> {
        Err(PolicyError::unconfigured("available_item_for_document"))
    }

    fn item_location(&self, _item_pid: &str) -> Result<Option<LocationPid>, PolicyError> {
        Err(PolicyError::unconfigured("item_location"))
    }

    fn select_pending_request(
        &self,
        _item_pid: &str,
        _pending: &[Loan],
    ) -> Result<Option<LoanPid>, PolicyError> {
        Err(PolicyError::unconfigured("select_pending_request"))
    }

    fn item_availability_changed(
        &self,
        _item_pid: &str,
        _available: bool,
    ) -> Result<(), PolicyError> {
        Err(PolicyError::unconfigured("item_availability_changed"))
    }
}

/// Configuration for the reference policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardPolicyConfig {
    /// Loan period length in days
    pub loan_days: i64,

    /// Length of one extension in days
    pub extension_days: i64,

    /// Maximum number of extensions per loan
    pub max_extensions: u32,
}

impl Default for StandardPolicyConfig {
    fn default() -> Self {
        StandardPolicyConfig {
            loan_days: 30,
            extension_days: 15,
            max_extensions: 2,
        }
    }
}

/// One registered item in the catalogue
#[derive(Debug, Clone)]
struct CatalogueItem {
    document_pid: String,
    location_pid: Option<LocationPid>,
    available: bool,
    can_circulate: bool,
}

/// In-memory reference policy
///
/// Holds a catalogue of registered items keyed by item pid. The BTreeMap
/// keeps auto-assignment deterministic: `available_item_for_document` returns
/// the first matching item in pid order. The catalogue sits behind a Mutex
/// because `item_availability_changed` mutates it through `&self`.
#[derive(Debug, Default)]
pub struct StandardPolicy {
    config: StandardPolicyConfig,
    catalogue: Mutex<BTreeMap<ItemPid, CatalogueItem>>,
}

impl StandardPolicy {
    /// Create a StandardPolicy with the given configuration
    pub fn new(config: StandardPolicyConfig) -> Self {
        StandardPolicy {
            config,
            catalogue: Mutex::new(BTreeMap::new()),
        }
    }

    /// The configuration this policy was built with
    pub fn config(&self) -> StandardPolicyConfig {
        self.config
    }

    /// Register an item as available and circulating
    pub fn register_item(
        &self,
        item_pid: &str,
        document_pid: &str,
        location_pid: Option<&str>,
    ) {
        let mut catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        catalogue.insert(
            item_pid.to_string(),
            CatalogueItem {
                document_pid: document_pid.to_string(),
                location_pid: location_pid.map(str::to_string),
                available: true,
                can_circulate: true,
            },
        );
    }

    /// Mark a registered item as non-circulating (reference only, on display)
    pub fn withdraw_item(&self, item_pid: &str) {
        let mut catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(item) = catalogue.get_mut(item_pid) {
            item.can_circulate = false;
        }
    }

    /// Whether the item is currently marked available
    pub fn is_item_available(&self, item_pid: &str) -> bool {
        let catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        catalogue.get(item_pid).map(|i| i.available).unwrap_or(false)
    }
}

impl PolicyProvider for StandardPolicy {
    fn item_can_circulate(&self, item_pid: &str) -> Result<bool, PolicyError> {
        let catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(catalogue
            .get(item_pid)
            .map(|i| i.can_circulate)
            .unwrap_or(false))
    }

    fn loan_duration(&self, _loan: &Loan) -> Result<i64, PolicyError> {
        Ok(self.config.loan_days)
    }

    fn extension_duration(&self, _loan: &Loan) -> Result<i64, PolicyError> {
        Ok(self.config.extension_days)
    }

    fn is_loan_duration_valid(&self, loan: &Loan) -> Result<bool, PolicyError> {
        match (loan.start_date, loan.end_date) {
            (Some(start), Some(end)) => Ok(start <= end),
            // Unset dates are the pre-transition default and not an error.
            _ => Ok(true),
        }
    }

    fn should_auto_assign_item(&self, _loan: &Loan) -> Result<bool, PolicyError> {
        Ok(true)
    }

    fn can_extend(&self, loan: &Loan) -> Result<bool, PolicyError> {
        Ok(loan.extension_count < self.config.max_extensions)
    }

    fn can_be_requested(&self, loan: &Loan) -> Result<bool, PolicyError> {
        // A document with no circulating copies cannot be requested.
        let catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(catalogue
            .values()
            .any(|i| i.document_pid == loan.document_pid && i.can_circulate))
    }

    fn is_trigger_permitted(
        &self,
        _actor: &ActorContext,
        _loan: &Loan,
        _trigger: Trigger,
    ) -> Result<bool, PolicyError> {
        Ok(true)
    }

    fn available_item_for_document(
        &self,
        document_pid: &str,
    ) -> Result<Option<ItemPid>, PolicyError> {
        let catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(catalogue
            .iter()
            .find(|(_, item)| {
                item.document_pid == document_pid && item.available && item.can_circulate
            })
            .map(|(pid, _)| pid.clone()))
    }

    fn item_location(&self, item_pid: &str) -> Result<Option<LocationPid>, PolicyError> {
        let catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(catalogue.get(item_pid).and_then(|i| i.location_pid.clone()))
    }

    fn select_pending_request(
        &self,
        _item_pid: &str,
        pending: &[Loan],
    ) -> Result<Option<LoanPid>, PolicyError> {
        // Oldest request first; requests that already hold an item keep it.
        Ok(pending
            .iter()
            .find(|loan| loan.item_pid.is_none())
            .map(|loan| loan.pid.clone()))
    }

    fn item_availability_changed(
        &self,
        item_pid: &str,
        available: bool,
    ) -> Result<(), PolicyError> {
        let mut catalogue = self
            .catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(item) = catalogue.get_mut(item_pid) {
            item.available = available;
        }
        Ok(())
    }
}
